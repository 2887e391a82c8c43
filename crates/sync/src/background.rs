// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background trigger coordinator.
//!
//! Bridges the host's background-execution facility (when there is one) to
//! the engine. Outbound, it registers a sync tag after each enqueue. Inbound,
//! it mirrors progress signals into the status board. It never delivers
//! anything itself: a `sync-started` signal only wakes the engine.

use std::sync::Arc;

use ob_core::{ClockSource, MutationFilter, MutationStatus, Store};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::status_board::StatusBoard;

/// Failure reported by the host facility.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("background host error: {0}")]
pub struct HostError(pub String);

/// Host capability for scheduling a background sync.
pub trait BackgroundHost: Send + Sync {
    /// Asks the host to wake the app for `tag` when it sees fit.
    fn request_background_sync(&self, tag: &str) -> std::result::Result<(), HostError>;
}

/// Inbound message from the host facility.
///
/// Wire form is JSON tagged by `type`:
/// `{"type": "item-synced", "success": false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BackgroundSignal {
    SyncStarted,
    ItemSynced {
        success: bool,
    },
    SyncCompleted {
        #[serde(default)]
        error: Option<String>,
    },
}

/// What the caller should do after a signal was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The host opened a sync window; run the engine.
    WakeEngine,
    /// The signal was mirrored into the status board.
    Mirrored,
}

pub struct BackgroundCoordinator {
    host: Option<Arc<dyn BackgroundHost>>,
    tag: String,
    store: Arc<Store>,
    board: Arc<StatusBoard>,
    clock: Arc<dyn ClockSource>,
}

impl BackgroundCoordinator {
    pub fn new(
        host: Option<Arc<dyn BackgroundHost>>,
        tag: String,
        store: Arc<Store>,
        board: Arc<StatusBoard>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        BackgroundCoordinator {
            host,
            tag,
            store,
            board,
            clock,
        }
    }

    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    /// Registers the sync tag with the host. Returns true if the host accepted it.
    ///
    /// Without a host this is a no-op; failures are logged and swallowed.
    pub fn register(&self) -> bool {
        let Some(host) = &self.host else {
            debug!("no background host, skipping registration");
            return false;
        };
        match host.request_background_sync(&self.tag) {
            Ok(()) => {
                debug!(tag = %self.tag, "background sync requested");
                true
            }
            Err(e) => {
                warn!(tag = %self.tag, error = %e, "background sync registration failed");
                false
            }
        }
    }

    /// Applies one inbound signal.
    pub fn handle(&self, signal: BackgroundSignal) -> SignalOutcome {
        debug!(?signal, "background signal");
        match signal {
            BackgroundSignal::SyncStarted => SignalOutcome::WakeEngine,
            BackgroundSignal::ItemSynced { success } => {
                self.refresh_counts();
                if !success {
                    self.board.record_external_failure();
                }
                SignalOutcome::Mirrored
            }
            BackgroundSignal::SyncCompleted { error } => {
                self.refresh_counts();
                self.board.record_external_completion(error, self.clock.now());
                SignalOutcome::Mirrored
            }
        }
    }

    fn refresh_counts(&self) {
        let counts = self.store.count(&MutationFilter::active()).and_then(|pending| {
            self.store
                .count(&MutationFilter::status(MutationStatus::FailedPermanent))
                .map(|dead| (pending, dead))
        });
        match counts {
            Ok((pending, dead)) => self.board.set_counts(pending, dead),
            Err(e) => warn!(error = %e, "could not refresh counts for background signal"),
        }
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
