// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitor.
//!
//! The host's reachability signal is a hint. The monitor turns raw readings
//! into transition events, so `Online`/`Offline` are emitted exactly once per
//! change, and lets the engine report failed calls as offline evidence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ob_core::StatusEvent;
use tracing::info;

use crate::status_board::StatusBoard;

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

impl From<ConnectivityEvent> for StatusEvent {
    fn from(event: ConnectivityEvent) -> Self {
        match event {
            ConnectivityEvent::Online => StatusEvent::Online,
            ConnectivityEvent::Offline => StatusEvent::Offline,
        }
    }
}

/// Tracks the last known reachability and publishes transitions to the status board.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    board: Arc<StatusBoard>,
}

impl ConnectivityMonitor {
    pub fn new(initial: bool, board: Arc<StatusBoard>) -> Self {
        ConnectivityMonitor {
            online: AtomicBool::new(initial),
            board,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records a reading. Returns the event only when the reading differs from
    /// the last one.
    pub fn observe(&self, online: bool) -> Option<ConnectivityEvent> {
        if self.online.swap(online, Ordering::SeqCst) == online {
            return None;
        }
        let event = if online {
            ConnectivityEvent::Online
        } else {
            ConnectivityEvent::Offline
        };
        info!(?event, "connectivity changed");
        self.board.apply(event.into());
        Some(event)
    }

    /// A delivery failed in a way that means the network is not usable.
    pub fn report_unreachable(&self) -> Option<ConnectivityEvent> {
        self.observe(false)
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
