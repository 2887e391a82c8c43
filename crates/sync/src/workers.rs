// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running tasks started by [`Outbox::spawn_workers`](crate::Outbox::spawn_workers).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::background::BackgroundSignal;
use crate::engine::SyncReport;
use crate::error::Result;
use crate::outbox::Outbox;

/// Follows the host reachability signal, including its current value.
pub(crate) async fn watch_connectivity(
    outbox: Arc<Outbox>,
    mut rx: watch::Receiver<bool>,
    cancel: CancellationToken,
) {
    loop {
        let online = *rx.borrow_and_update();
        log_triggered(outbox.set_online(online).await, "connectivity");

        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("connectivity signal closed");
                    break;
                }
            }
        }
    }
}

/// Applies background-facility signals in arrival order.
pub(crate) async fn consume_signals(
    outbox: Arc<Outbox>,
    mut rx: mpsc::Receiver<BackgroundSignal>,
    cancel: CancellationToken,
) {
    loop {
        let signal = tokio::select! {
            _ = cancel.cancelled() => break,
            signal = rx.recv() => signal,
        };
        let Some(signal) = signal else {
            debug!("background signal channel closed");
            break;
        };
        log_triggered(outbox.handle_background(signal).await, "background");
    }
}

/// Runs the engine whenever the earliest backoff delay has passed.
///
/// Sleeps until the next scheduled retry. Any status change wakes it to
/// recompute the schedule, so new failures and connectivity edges are picked
/// up. Nothing is scheduled while offline or while another run is active.
pub(crate) async fn retry_when_due(outbox: Arc<Outbox>, cancel: CancellationToken) {
    let mut status = outbox.subscribe();
    loop {
        status.borrow_and_update();
        let wait = match outbox.retry_wait() {
            Ok(wait) => wait,
            Err(e) => {
                warn!(error = %e, "could not read retry schedule");
                None
            }
        };

        if wait == Some(Duration::ZERO) {
            match outbox.run_sync().await {
                Ok(report) => {
                    debug!(?report, "retry pass finished");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "retry pass failed");
                    status.borrow_and_update();
                }
            }
        }

        let delay = wait.filter(|wait| !wait.is_zero());
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(delay.unwrap_or_default()), if delay.is_some() => {}
        }
    }
}

/// Purges expired cache entries and recomputes stats on a fixed interval,
/// independent of sync runs.
pub(crate) async fn refresh_stats(
    outbox: Arc<Outbox>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = outbox.purge_expired_cache() {
                    warn!(error = %e, "cache purge failed");
                }
                outbox.stats();
            }
        }
    }
}

fn log_triggered(result: Result<Option<SyncReport>>, trigger: &str) {
    match result {
        Ok(Some(report)) => debug!(trigger, ?report, "triggered sync finished"),
        Ok(None) => {}
        Err(e) => warn!(trigger, error = %e, "triggered sync failed"),
    }
}
