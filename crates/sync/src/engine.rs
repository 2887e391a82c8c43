// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation engine.
//!
//! The engine is the only writer of a mutation's `status` and `attempts`.
//! A run holds a process-wide lock, lists the queue in insertion order, and
//! delivers one record at a time:
//!
//! ```text
//! pending ──mark──► in-flight ──2xx──────────────► (deleted)
//!    ▲                  │
//!    │                  ├──5xx/network/timeout──► pending (+backoff)
//!    └──────────────────┤                           or failed-permanent once
//!                       │                           the retry budget is spent
//!                       └──4xx─────────────────► failed-permanent
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use ob_core::{ClockSource, MutationFilter, MutationStatus, PendingMutation, Store};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::Result;
use crate::status_board::{RunOutcome, StatusBoard};
use crate::transport::{Delivery, Transport, TransportError};

/// Why a run did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Another run holds the sync lock.
    AlreadyRunning,
    /// The connectivity monitor reports offline.
    Offline,
}

/// Outcome of [`Reconciler::run_sync`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Records acknowledged and removed in this run.
    pub delivered: usize,
    /// Records moved to `failed-permanent` in this run.
    pub failed_permanent: usize,
    /// Pending plus in-flight records when the run returned.
    pub remaining: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl SyncReport {
    fn skipped(reason: SkipReason, remaining: usize) -> Self {
        SyncReport {
            remaining,
            skipped: Some(reason),
            ..SyncReport::default()
        }
    }
}

/// Delivers queued mutations to the remote API.
pub struct Reconciler {
    store: Arc<Store>,
    transport: Arc<dyn Transport>,
    monitor: Arc<ConnectivityMonitor>,
    board: Arc<StatusBoard>,
    clock: Arc<dyn ClockSource>,
    retry: RetryConfig,
    request_timeout: Duration,
    lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        store: Arc<Store>,
        transport: Arc<dyn Transport>,
        monitor: Arc<ConnectivityMonitor>,
        board: Arc<StatusBoard>,
        clock: Arc<dyn ClockSource>,
        retry: RetryConfig,
        request_timeout: Duration,
    ) -> Self {
        Reconciler {
            store,
            transport,
            monitor,
            board,
            clock,
            retry,
            request_timeout,
            lock: Mutex::new(()),
        }
    }

    /// Returns true while a run holds the sync lock.
    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Earliest scheduled retry among pending records.
    ///
    /// Records that never failed have no schedule and are not counted.
    pub fn next_retry_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .store
            .list(&MutationFilter::status(MutationStatus::Pending))?
            .into_iter()
            .filter_map(|record| record.next_attempt_at)
            .min())
    }

    /// Runs one drain of the queue.
    ///
    /// Returns immediately when another run is active or the host is offline.
    /// Per-record delivery failures are recorded on the record, not returned.
    /// A store failure aborts the run and releases the lock.
    pub async fn run_sync(&self) -> Result<SyncReport> {
        let Ok(_guard) = self.lock.try_lock() else {
            let remaining = self.store.count(&MutationFilter::active())?;
            debug!(remaining, "sync already running, coalescing trigger");
            return Ok(SyncReport::skipped(SkipReason::AlreadyRunning, remaining));
        };

        if !self.monitor.is_online() {
            let remaining = self.store.count(&MutationFilter::active())?;
            debug!(remaining, "offline, not syncing");
            return Ok(SyncReport::skipped(SkipReason::Offline, remaining));
        }

        let recovered = self.store.reset_in_flight()?;
        if recovered > 0 {
            warn!(recovered, "recovered in-flight mutations from an interrupted run");
        }

        let queue = self.store.list(&MutationFilter::status(MutationStatus::Pending))?;
        if queue.is_empty() {
            let dead_letters = self.dead_letter_count()?;
            self.board.record_idle_run(dead_letters, self.clock.now());
            debug!("queue empty");
            return Ok(SyncReport::default());
        }

        self.board.begin_run(queue.len());
        info!(queued = queue.len(), "sync started");

        match self.drain(queue).await {
            Ok(report) => {
                info!(
                    delivered = report.delivered,
                    failed_permanent = report.failed_permanent,
                    remaining = report.remaining,
                    "sync finished"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "sync aborted");
                self.board.abort_run(e.to_string());
                Err(e)
            }
        }
    }

    async fn drain(&self, queue: Vec<PendingMutation>) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut last_error = None;
        let mut backing_off_error = None;

        for mut record in queue {
            if !self.monitor.is_online() {
                debug!("went offline, leaving the rest of the queue untouched");
                break;
            }
            let now = self.clock.now();
            if !record.is_due(now) {
                debug!(id = %record.id, "backing off, skipped this pass");
                if record.last_error.is_some() {
                    backing_off_error = record.last_error;
                }
                continue;
            }

            record.status = MutationStatus::InFlight;
            self.store.put(&record)?;

            let result = self.deliver(&record).await;
            record.attempts = record.attempts.saturating_add(1);

            match result {
                Ok(()) => {
                    self.store.delete(&record.id)?;
                    report.delivered += 1;
                    debug!(id = %record.id, attempts = record.attempts, "delivered");
                }
                Err(err) => {
                    let message = err.to_string();
                    if self.settle_failure(&mut record, &err, now) {
                        report.failed_permanent += 1;
                    }
                    self.store.put(&record)?;
                    last_error = Some(message);
                    if err.is_connectivity() {
                        self.monitor.report_unreachable();
                    }
                }
            }

            self.board
                .set_pending(self.store.count(&MutationFilter::active())?);
        }

        let pending = self.store.count(&MutationFilter::active())?;
        let dead_letters = self.dead_letter_count()?;
        // Records still waiting out a backoff keep their failure visible.
        let last_error = last_error.or(backing_off_error).or_else(|| {
            (dead_letters > 0).then(|| format!("{dead_letters} mutation(s) dead-lettered"))
        });
        self.board.finish_run(RunOutcome {
            pending,
            dead_letters,
            last_error,
            finished_at: self.clock.now(),
        });

        report.remaining = pending;
        Ok(report)
    }

    async fn deliver(&self, record: &PendingMutation) -> std::result::Result<(), TransportError> {
        let delivery = Delivery::from(record);
        match tokio::time::timeout(self.request_timeout, self.transport.deliver(delivery)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Applies a failed attempt to the record. Returns true if it was dead-lettered.
    fn settle_failure(
        &self,
        record: &mut PendingMutation,
        err: &TransportError,
        now: DateTime<Utc>,
    ) -> bool {
        record.last_error = Some(err.to_string());

        if err.is_permanent() {
            warn!(id = %record.id, error = %err, "rejected, dead-lettering");
            record.status = MutationStatus::FailedPermanent;
            record.next_attempt_at = None;
            return true;
        }

        let used = record.budget_used();
        if used >= self.retry.max_attempts {
            warn!(
                id = %record.id,
                attempts = record.attempts,
                error = %err,
                "retry budget exhausted, dead-lettering"
            );
            record.status = MutationStatus::FailedPermanent;
            record.next_attempt_at = None;
            return true;
        }

        let delay = self.retry.delay_for(used);
        let delay = TimeDelta::from_std(delay).unwrap_or(TimeDelta::MAX);
        warn!(
            id = %record.id,
            attempts = record.attempts,
            error = %err,
            "transient failure, will retry"
        );
        record.status = MutationStatus::Pending;
        record.next_attempt_at = now.checked_add_signed(delay);
        false
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Manual remediation
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves one dead letter back to `pending` with a fresh retry budget.
    pub async fn requeue(&self, id: &str) -> Result<PendingMutation> {
        let _guard = self.lock.lock().await;
        let mut record = self.dead_letter(id)?;
        reopen(&mut record);
        self.store.put(&record)?;
        info!(id, "dead letter requeued");
        self.refresh_counts()?;
        Ok(record)
    }

    /// Requeues every dead letter. Returns how many were moved.
    pub async fn requeue_all(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let dead = self
            .store
            .list(&MutationFilter::status(MutationStatus::FailedPermanent))?;
        for mut record in dead.iter().cloned() {
            reopen(&mut record);
            self.store.put(&record)?;
        }
        info!(count = dead.len(), "dead letters requeued");
        self.refresh_counts()?;
        Ok(dead.len())
    }

    /// Deletes one dead letter for good.
    pub async fn discard(&self, id: &str) -> Result<PendingMutation> {
        let _guard = self.lock.lock().await;
        let record = self.dead_letter(id)?;
        self.store.delete(id)?;
        info!(id, "dead letter discarded");
        self.refresh_counts()?;
        Ok(record)
    }

    fn dead_letter(&self, id: &str) -> Result<PendingMutation> {
        let record = self
            .store
            .get(id)?
            .ok_or_else(|| ob_core::Error::MutationNotFound(id.to_string()))?;
        if !record.is_dead_letter() {
            return Err(ob_core::Error::NotDeadLettered {
                id: id.to_string(),
                status: record.status.to_string(),
            }
            .into());
        }
        Ok(record)
    }

    fn dead_letter_count(&self) -> Result<usize> {
        Ok(self
            .store
            .count(&MutationFilter::status(MutationStatus::FailedPermanent))?)
    }

    fn refresh_counts(&self) -> Result<()> {
        let pending = self.store.count(&MutationFilter::active())?;
        self.board.set_counts(pending, self.dead_letter_count()?);
        Ok(())
    }
}

fn reopen(record: &mut PendingMutation) {
    record.status = MutationStatus::Pending;
    record.retry_floor = record.attempts;
    record.next_attempt_at = None;
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
