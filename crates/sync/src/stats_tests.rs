// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use ob_core::ManualClock;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

fn aggregator(store: Arc<Store>) -> (StatsAggregator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(10_000));
    (
        StatsAggregator::new(store, Arc::clone(&clock) as Arc<dyn ClockSource>),
        clock,
    )
}

#[test]
fn zero_before_first_refresh() {
    let (stats, _) = aggregator(Arc::new(Store::open_in_memory().unwrap()));
    assert_eq!(stats.get(), StorageStats::default());
    assert_eq!(stats.refreshed_at(), None);
}

#[test]
fn refresh_counts_every_collection() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let (stats, clock) = aggregator(Arc::clone(&store));
    let now = clock.now();
    store.insert_new("notes", json!({"n": 1}), "t", now).unwrap();
    store.insert_new("notes", json!({"n": 2}), "t", now).unwrap();
    store.save_draft("intake", &json!({"step": 2}), now).unwrap();
    store
        .cache_put("patients", &json!([1, 2]), Some(Duration::from_secs(60)), now)
        .unwrap();

    let refreshed = stats.refresh();
    assert_eq!(
        refreshed,
        StorageStats {
            pending: 2,
            dead_letters: 0,
            drafts: 1,
            cache_entries: 1,
        }
    );
    assert_eq!(stats.get(), refreshed);
    assert_eq!(stats.refreshed_at(), Some(now));
}

#[test]
fn repeated_refresh_is_identical() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let (stats, clock) = aggregator(Arc::clone(&store));
    store.insert_new("notes", json!({}), "t", clock.now()).unwrap();
    assert_eq!(stats.refresh(), stats.refresh());
}

#[test]
fn cache_entries_drop_out_when_expired() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let (stats, clock) = aggregator(Arc::clone(&store));
    store
        .cache_put("k", &json!(1), Some(Duration::from_secs(1)), clock.now())
        .unwrap();
    assert_eq!(stats.refresh().cache_entries, 1);

    clock.advance(2_000);
    assert_eq!(stats.refresh().cache_entries, 0);
}

#[test]
fn store_failure_returns_last_known_good() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("outbox.db");
    let store = Arc::new(Store::open(&path).unwrap());
    let (stats, clock) = aggregator(Arc::clone(&store));
    store.save_draft("d", &json!({}), clock.now()).unwrap();
    let good = stats.refresh();
    assert_eq!(good.drafts, 1);

    // Break the schema behind the store's back.
    let other = rusqlite::Connection::open(&path).unwrap();
    other.execute_batch("DROP TABLE drafts;").unwrap();

    clock.advance(5_000);
    assert_eq!(stats.refresh(), good);
    assert_eq!(stats.refreshed_at(), Some(ob_core::clock::from_millis(10_000)));
}
