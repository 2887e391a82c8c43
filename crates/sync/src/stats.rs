// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Stats aggregator.
//!
//! Keeps the last good [`StorageStats`] so display code never sees a store
//! error. Reads only.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use ob_core::{ClockSource, StorageStats, Store};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    stats: StorageStats,
    refreshed_at: DateTime<Utc>,
}

pub struct StatsAggregator {
    store: Arc<Store>,
    clock: Arc<dyn ClockSource>,
    latest: RwLock<Option<Snapshot>>,
}

impl StatsAggregator {
    pub fn new(store: Arc<Store>, clock: Arc<dyn ClockSource>) -> Self {
        StatsAggregator {
            store,
            clock,
            latest: RwLock::new(None),
        }
    }

    /// Recomputes stats from the store.
    ///
    /// On a store failure the previous value is returned (zeros if there never was one).
    pub fn refresh(&self) -> StorageStats {
        let now = self.clock.now();
        match self.store.stats(now) {
            Ok(stats) => {
                debug!(?stats, "stats refreshed");
                *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(Snapshot {
                    stats,
                    refreshed_at: now,
                });
                stats
            }
            Err(e) => {
                warn!(error = %e, "stats refresh failed, keeping last known values");
                self.get()
            }
        }
    }

    /// Returns the last computed stats without touching the store.
    pub fn get(&self) -> StorageStats {
        self.snapshot().map(|s| s.stats).unwrap_or_default()
    }

    /// When the current value was computed, if ever.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot().map(|s| s.refreshed_at)
    }

    fn snapshot(&self) -> Option<Snapshot> {
        *self.latest.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
