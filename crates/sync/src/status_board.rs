// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared, observable [`SyncStatus`].
//!
//! Every component that changes what the UI sees goes through the board, so
//! the connectivity monitor, the engine, and background signals all land in
//! one status value. Observers get updates through a `watch` channel.

use chrono::{DateTime, Utc};
use ob_core::{StatusEvent, SyncStatus};
use tokio::sync::watch;

/// Message used when a background item fails without further detail.
pub const BACKGROUND_ITEM_FAILED: &str = "background item failed";

/// Final figures of a sync run, applied in one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub pending: usize,
    pub dead_letters: usize,
    pub last_error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// Single source of truth for the observable sync status.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<SyncStatus>,
}

impl StatusBoard {
    pub fn new(initial: SyncStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        StatusBoard { tx }
    }

    /// Returns a copy of the current status.
    pub fn snapshot(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    /// Feeds one event through the state machine. Returns true if the state changed.
    pub fn apply(&self, event: StatusEvent) -> bool {
        let mut changed = false;
        self.tx.send_if_modified(|status| {
            changed = status.apply(event);
            changed
        });
        changed
    }

    /// Marks a run as started: `is_syncing` goes up and the machine sees `SyncStarted`.
    pub fn begin_run(&self, pending: usize) {
        self.tx.send_modify(|status| {
            status.apply(StatusEvent::SyncStarted);
            status.is_syncing = true;
            status.pending_count = pending;
        });
    }

    /// Publishes progress while a run is draining.
    pub fn set_pending(&self, pending: usize) {
        self.tx.send_if_modified(|status| {
            let modified = status.pending_count != pending;
            status.pending_count = pending;
            modified
        });
    }

    /// Replaces both counters.
    pub fn set_counts(&self, pending: usize, dead_letters: usize) {
        self.tx.send_if_modified(|status| {
            let modified =
                status.pending_count != pending || status.dead_letter_count != dead_letters;
            status.pending_count = pending;
            status.dead_letter_count = dead_letters;
            modified
        });
    }

    /// Closes a completed run.
    pub fn finish_run(&self, outcome: RunOutcome) {
        self.tx.send_modify(|status| {
            status.apply(StatusEvent::SyncFinished {
                dead_letters: outcome.dead_letters,
            });
            status.is_syncing = false;
            status.pending_count = outcome.pending;
            status.dead_letter_count = outcome.dead_letters;
            status.last_error = outcome.last_error;
            status.last_sync_at = Some(outcome.finished_at);
        });
    }

    /// Closes a run the store cut short. Counters keep their last observed values.
    pub fn abort_run(&self, error: String) {
        self.tx.send_modify(|status| {
            status.apply(StatusEvent::SyncAborted);
            status.is_syncing = false;
            status.last_error = Some(error);
        });
    }

    /// Records a run that needed no deliveries.
    pub fn record_idle_run(&self, dead_letters: usize, finished_at: DateTime<Utc>) {
        self.tx.send_modify(|status| {
            status.pending_count = 0;
            status.dead_letter_count = dead_letters;
            status.last_sync_at = Some(finished_at);
            if dead_letters == 0 {
                status.last_error = None;
            }
        });
    }

    /// Notes a failed item reported by the host's background facility.
    pub fn record_external_failure(&self) {
        self.tx.send_if_modified(|status| {
            if status.last_error.is_some() {
                return false;
            }
            status.last_error = Some(BACKGROUND_ITEM_FAILED.to_string());
            true
        });
    }

    /// Mirrors a completion reported by the host's background facility.
    pub fn record_external_completion(&self, error: Option<String>, at: DateTime<Utc>) {
        self.tx.send_modify(|status| {
            status.last_sync_at = Some(at);
            status.last_error = error;
        });
    }
}

#[cfg(test)]
#[path = "status_board_tests.rs"]
mod tests;
