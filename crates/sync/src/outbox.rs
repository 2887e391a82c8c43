// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-facing facade.
//!
//! [`Outbox`] wires the store, engine, connectivity monitor, background
//! coordinator, and stats aggregator together. Application code talks to this
//! type only.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ob_core::{
    ClockSource, Draft, MutationFilter, MutationStatus, PendingMutation, StorageStats, Store,
    SyncStatus, SystemClock,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::background::{BackgroundCoordinator, BackgroundHost, BackgroundSignal, SignalOutcome};
use crate::config::Config;
use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor};
use crate::engine::{Reconciler, SyncReport};
use crate::error::{Error, Result};
use crate::stats::StatsAggregator;
use crate::status_board::StatusBoard;
use crate::transport::{HttpTransport, Transport};
use crate::workers;

/// Name of the SQLite file inside the state directory.
pub const STORE_FILE_NAME: &str = "outbox.db";

/// Builder for [`Outbox`].
pub struct OutboxBuilder {
    store: Store,
    transport: Arc<dyn Transport>,
    config: Config,
    host: Option<Arc<dyn BackgroundHost>>,
    clock: Arc<dyn ClockSource>,
    online: bool,
}

impl OutboxBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Attaches the host's background-execution facility.
    pub fn host(mut self, host: Arc<dyn BackgroundHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    /// First reading of the host's connectivity signal (default: offline).
    pub fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn build(self) -> Result<Outbox> {
        self.config.validate()?;

        let store = Arc::new(self.store);
        let pending = store.count(&MutationFilter::active())?;
        let dead_letters = store.count(&MutationFilter::status(MutationStatus::FailedPermanent))?;

        let board = Arc::new(StatusBoard::new(SyncStatus::new(
            self.online,
            pending,
            dead_letters,
        )));
        let monitor = Arc::new(ConnectivityMonitor::new(self.online, Arc::clone(&board)));
        let engine = Arc::new(Reconciler::new(
            Arc::clone(&store),
            self.transport,
            Arc::clone(&monitor),
            Arc::clone(&board),
            Arc::clone(&self.clock),
            self.config.retry.clone(),
            self.config.remote.timeout(),
        ));
        let background = BackgroundCoordinator::new(
            self.host,
            self.config.background.tag.clone(),
            Arc::clone(&store),
            Arc::clone(&board),
            Arc::clone(&self.clock),
        );
        let stats = StatsAggregator::new(Arc::clone(&store), Arc::clone(&self.clock));
        stats.refresh();

        Ok(Outbox {
            store,
            board,
            monitor,
            engine,
            background,
            stats,
            clock: self.clock,
            config: self.config,
        })
    }
}

/// Offline write queue with background reconciliation.
pub struct Outbox {
    store: Arc<Store>,
    board: Arc<StatusBoard>,
    monitor: Arc<ConnectivityMonitor>,
    engine: Arc<Reconciler>,
    background: BackgroundCoordinator,
    stats: StatsAggregator,
    clock: Arc<dyn ClockSource>,
    config: Config,
}

/// Host inputs consumed by [`Outbox::spawn_workers`].
#[derive(Default)]
pub struct WorkerInputs {
    /// Host reachability signal.
    pub connectivity: Option<watch::Receiver<bool>>,
    /// Inbound background-facility signals.
    pub signals: Option<mpsc::Receiver<BackgroundSignal>>,
}

/// Handles to the tasks started by [`Outbox::spawn_workers`].
pub struct Workers {
    connectivity: Option<JoinHandle<()>>,
    signals: Option<JoinHandle<()>>,
    retry: JoinHandle<()>,
    stats: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Workers {
    /// Number of tasks started.
    pub fn count(&self) -> usize {
        2 + usize::from(self.connectivity.is_some()) + usize::from(self.signals.is_some())
    }

    /// Waits for the input-driven workers to finish their queued input (their
    /// senders must already be dropped), then stops the retry scheduler and
    /// the stats ticker.
    pub async fn drain(self) {
        for handle in [self.connectivity, self.signals].into_iter().flatten() {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task failed");
            }
        }
        self.cancel.cancel();
        for (name, handle) in [("retry", self.retry), ("stats", self.stats)] {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "worker task failed");
            }
        }
    }

    /// Stops every worker now and waits for them to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.drain().await;
    }
}

impl Outbox {
    pub fn builder(store: Store, transport: Arc<dyn Transport>) -> OutboxBuilder {
        OutboxBuilder {
            store,
            transport,
            config: Config::default(),
            host: None,
            clock: Arc::new(SystemClock),
            online: false,
        }
    }

    /// Opens the outbox in `dir` using `config.toml` and the HTTP transport.
    pub fn open(dir: &Path, host: Option<Arc<dyn BackgroundHost>>, online: bool) -> Result<Self> {
        Self::open_with_config(dir, Config::load(dir)?, host, online)
    }

    /// Opens the outbox in `dir` with an already loaded config.
    pub fn open_with_config(
        dir: &Path,
        config: Config,
        host: Option<Arc<dyn BackgroundHost>>,
        online: bool,
    ) -> Result<Self> {
        let store = Store::open(&dir.join(STORE_FILE_NAME))?;
        let transport = Arc::new(HttpTransport::new(config.remote.clone())?);
        let mut builder = Outbox::builder(store, transport).config(config).online(online);
        if let Some(host) = host {
            builder = builder.host(host);
        }
        builder.build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Caller-facing API
    // ─────────────────────────────────────────────────────────────────────────

    /// Queues a mutation durably and returns its id.
    ///
    /// Succeeds offline; delivery happens on a later sync.
    pub fn enqueue(
        &self,
        resource_kind: &str,
        payload: serde_json::Value,
        credential: &str,
    ) -> Result<String> {
        if !ob_core::id::validate_resource_kind(resource_kind) {
            return Err(Error::InvalidResourceKind(resource_kind.to_string()));
        }
        let mutation = self
            .store
            .insert_new(resource_kind, payload, credential, self.clock.now())?;
        info!(id = %mutation.id, kind = resource_kind, "mutation queued");

        self.refresh_counts()?;
        self.background.register();
        Ok(mutation.id)
    }

    /// Runs one sync pass (coalesced if one is already running).
    pub async fn run_sync(&self) -> Result<SyncReport> {
        self.engine.run_sync().await
    }

    /// Recomputes and returns storage stats. Never fails.
    pub fn stats(&self) -> StorageStats {
        self.stats.refresh()
    }

    /// Returns the last computed stats without reading the store.
    pub fn cached_stats(&self) -> StorageStats {
        self.stats.get()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.board.snapshot()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.board.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Host signals
    // ─────────────────────────────────────────────────────────────────────────

    /// Feeds a connectivity reading. Coming online with queued work triggers a sync.
    pub async fn set_online(&self, online: bool) -> Result<Option<SyncReport>> {
        match self.monitor.observe(online) {
            Some(ConnectivityEvent::Online) if self.board.snapshot().pending_count > 0 => {
                self.engine.run_sync().await.map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Applies a background-facility signal, running the engine on `sync-started`.
    pub async fn handle_background(&self, signal: BackgroundSignal) -> Result<Option<SyncReport>> {
        match self.background.handle(signal) {
            SignalOutcome::WakeEngine => self.engine.run_sync().await.map(Some),
            SignalOutcome::Mirrored => Ok(None),
        }
    }

    /// Starts the connectivity watcher, signal consumer, retry scheduler, and
    /// stats ticker.
    ///
    /// All workers stop when `cancel` fires; the first two also stop when
    /// their input closes.
    pub fn spawn_workers(self: &Arc<Self>, inputs: WorkerInputs, cancel: CancellationToken) -> Workers {
        let connectivity = inputs.connectivity.map(|rx| {
            tokio::spawn(workers::watch_connectivity(
                Arc::clone(self),
                rx,
                cancel.clone(),
            ))
        });
        let signals = inputs.signals.map(|rx| {
            tokio::spawn(workers::consume_signals(
                Arc::clone(self),
                rx,
                cancel.clone(),
            ))
        });
        let retry = tokio::spawn(workers::retry_when_due(Arc::clone(self), cancel.clone()));
        let stats = tokio::spawn(workers::refresh_stats(
            Arc::clone(self),
            self.config.stats.refresh_interval(),
            cancel.clone(),
        ));
        Workers {
            connectivity,
            signals,
            retry,
            stats,
            cancel,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection and remediation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn list(&self, filter: &MutationFilter) -> Result<Vec<PendingMutation>> {
        Ok(self.store.list(filter)?)
    }

    pub fn get(&self, id: &str) -> Result<Option<PendingMutation>> {
        Ok(self.store.get(id)?)
    }

    pub fn dead_letters(&self) -> Result<Vec<PendingMutation>> {
        self.list(&MutationFilter::status(MutationStatus::FailedPermanent))
    }

    /// Requeues one dead letter with a fresh retry budget.
    pub async fn retry(&self, id: &str) -> Result<PendingMutation> {
        self.engine.requeue(id).await
    }

    /// Requeues every dead letter.
    pub async fn retry_all(&self) -> Result<usize> {
        self.engine.requeue_all().await
    }

    /// Deletes one dead letter.
    pub async fn discard(&self, id: &str) -> Result<PendingMutation> {
        self.engine.discard(id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Drafts and cache
    // ─────────────────────────────────────────────────────────────────────────

    pub fn save_draft(&self, key: &str, body: &serde_json::Value) -> Result<()> {
        Ok(self.store.save_draft(key, body, self.clock.now())?)
    }

    pub fn load_draft(&self, key: &str) -> Result<Option<Draft>> {
        Ok(self.store.load_draft(key)?)
    }

    pub fn delete_draft(&self, key: &str) -> Result<bool> {
        Ok(self.store.delete_draft(key)?)
    }

    pub fn list_drafts(&self) -> Result<Vec<Draft>> {
        Ok(self.store.list_drafts()?)
    }

    pub fn cache_put(
        &self,
        key: &str,
        body: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> Result<()> {
        Ok(self.store.cache_put(key, body, ttl, self.clock.now())?)
    }

    pub fn cache_get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.store.cache_get(key, self.clock.now())?)
    }

    /// Deletes cache entries past their expiry. Returns how many were removed.
    pub fn purge_expired_cache(&self) -> Result<usize> {
        let purged = self.store.cache_purge_expired(self.clock.now())?;
        if purged > 0 {
            debug!(purged, "expired cache entries removed");
        }
        Ok(purged)
    }

    /// Time until the earliest backoff expires. `None` while offline, while a
    /// run is active, or when no record is waiting on a retry.
    pub(crate) fn retry_wait(&self) -> Result<Option<Duration>> {
        if !self.monitor.is_online() || self.engine.is_running() {
            return Ok(None);
        }
        let Some(at) = self.engine.next_retry_at()? else {
            return Ok(None);
        };
        Ok(Some((at - self.clock.now()).to_std().unwrap_or_default()))
    }

    fn refresh_counts(&self) -> Result<()> {
        let pending = self.store.count(&MutationFilter::active())?;
        let dead_letters = self
            .store
            .count(&MutationFilter::status(MutationStatus::FailedPermanent))?;
        self.board.set_counts(pending, dead_letters);
        Ok(())
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
