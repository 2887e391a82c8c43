// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync status state machine.
//!
//! [`transition`] is the single authority for how the externally observable
//! sync state moves:
//!
//! ```text
//!                 Online                 SyncStarted
//! Disconnected ──────────► ConnectedIdle ───────────► ConnectedSyncing
//!      ▲                        ▲                      │          │
//!      │ Offline (any           │ SyncFinished{0}      │          │ SyncFinished{n>0}
//!      │ Connected* state)      └──────────────────────┘          ▼
//!      └───────────────────────────────────────────────────  ConnectedError
//!                                                  SyncStarted ──┘ (back to Syncing)
//!
//! `SyncAborted` (store failure mid-run) also moves Syncing to ConnectedError.
//! ```
//!
//! [`SyncStatus`] wraps the state with the counters shown to users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observable connectivity/sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    Disconnected,
    ConnectedIdle,
    ConnectedSyncing,
    ConnectedError,
}

impl SyncState {
    /// Initial state from the connectivity monitor's first reading.
    pub fn initial(online: bool) -> Self {
        if online {
            SyncState::ConnectedIdle
        } else {
            SyncState::Disconnected
        }
    }

    /// Returns the string representation used in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Disconnected => "disconnected",
            SyncState::ConnectedIdle => "connected-idle",
            SyncState::ConnectedSyncing => "connected-syncing",
            SyncState::ConnectedError => "connected-error",
        }
    }

    /// Returns true for every `Connected*` state.
    pub fn is_connected(&self) -> bool {
        !matches!(self, SyncState::Disconnected)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// Connectivity monitor observed the network coming up.
    Online,
    /// Connectivity monitor observed the network going down.
    Offline,
    /// A sync run acquired the lock.
    SyncStarted,
    /// A sync run released the lock; `dead_letters` is the store's
    /// failed-permanent count afterward.
    SyncFinished { dead_letters: usize },
    /// A sync run stopped early because the store failed.
    SyncAborted,
}

/// Computes the next state. Events that do not apply leave the state unchanged.
pub fn transition(state: SyncState, event: StatusEvent) -> SyncState {
    use StatusEvent as E;
    use SyncState as S;

    match (state, event) {
        (S::Disconnected, E::Online) => S::ConnectedIdle,
        (S::Disconnected, _) => S::Disconnected,

        (_, E::Offline) => S::Disconnected,

        (S::ConnectedIdle | S::ConnectedError, E::SyncStarted) => S::ConnectedSyncing,

        (S::ConnectedSyncing, E::SyncFinished { dead_letters: 0 }) => S::ConnectedIdle,
        (S::ConnectedSyncing, E::SyncFinished { .. }) => S::ConnectedError,
        (S::ConnectedSyncing, E::SyncAborted) => S::ConnectedError,

        (state, _) => state,
    }
}

/// Snapshot of everything a UI shows about the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub is_online: bool,
    /// True only while a sync run holds the lock.
    pub is_syncing: bool,
    /// Pending plus in-flight records at last observation.
    pub pending_count: usize,
    /// Dead-lettered records at last observation.
    pub dead_letter_count: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SyncStatus {
    /// Creates the status for a process start.
    pub fn new(online: bool, pending_count: usize, dead_letter_count: usize) -> Self {
        SyncStatus {
            state: SyncState::initial(online),
            is_online: online,
            is_syncing: false,
            pending_count,
            dead_letter_count,
            last_sync_at: None,
            last_error: None,
        }
    }

    /// Feeds an event through [`transition`] and keeps derived flags consistent.
    ///
    /// Returns true if the state changed.
    pub fn apply(&mut self, event: StatusEvent) -> bool {
        let next = transition(self.state, event);
        let changed = next != self.state;
        self.state = next;
        self.is_online = next.is_connected();
        changed
    }

    /// Records not yet acknowledged by the server, dead letters included.
    pub fn undelivered(&self) -> usize {
        self.pending_count + self.dead_letter_count
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
