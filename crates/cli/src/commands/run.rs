// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `outbox run`: long-lived host process.
//!
//! Host messages arrive as JSON lines on stdin (see [`crate::host`]).
//! Connectivity readings feed a `watch` channel; background signals feed an
//! `mpsc` queue. Both are consumed by the outbox workers. On end of input
//! the queued messages are drained before exit; Ctrl-C stops immediately.

use std::io::Stdout;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ob_sync::{BackgroundHost, BackgroundSignal, Config, Outbox, WorkerInputs};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::host::{HostInput, HostMessage, LineHost};
use crate::probe::Probe;
use crate::state::{RunMarker, SyncLock};

/// Inbound background signals buffered before the reader waits.
const SIGNAL_BUFFER: usize = 64;

pub async fn run(dir: &Path, probe: bool) -> Result<()> {
    let _lock = SyncLock::acquire(dir)?;
    let config = Config::load(dir)?;

    let probe = if probe {
        Some(Probe::for_url(
            &config.remote.url,
            config.connectivity.probe_timeout(),
        )?)
    } else {
        None
    };
    let initial = match &probe {
        Some(probe) => probe.check().await,
        None => false,
    };
    let probe_interval = config.connectivity.probe_interval();

    let host = Arc::new(LineHost::new(std::io::stdout()));
    let outbox = Arc::new(Outbox::open_with_config(
        dir,
        config,
        Some(Arc::clone(&host) as Arc<dyn BackgroundHost>),
        initial,
    )?);

    let (online_tx, online_rx) = watch::channel(initial);
    let online_tx = Arc::new(online_tx);
    let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
    let cancel = CancellationToken::new();

    let workers = outbox.spawn_workers(
        WorkerInputs {
            connectivity: Some(online_rx),
            signals: Some(signal_rx),
        },
        cancel.clone(),
    );
    let reporter = tokio::spawn(report_status(
        Arc::clone(&outbox),
        Arc::clone(&host),
        RunMarker::new(dir),
        cancel.clone(),
    ));
    let prober_cancel = cancel.child_token();
    let prober = probe.map(|probe| {
        tokio::spawn(probe_loop(
            probe,
            probe_interval,
            Arc::clone(&online_tx),
            prober_cancel.clone(),
        ))
    });

    info!(dir = %dir.display(), initial_online = initial, "outbox host running");
    let interrupted = read_host_messages(&online_tx, &signal_tx).await?;

    prober_cancel.cancel();
    join(prober, "probe").await;
    drop(online_tx);
    drop(signal_tx);

    if interrupted {
        info!("interrupted, stopping workers");
        workers.shutdown().await;
    } else {
        workers.drain().await;
    }
    join(Some(reporter), "status reporter").await;

    info!("outbox host stopped");
    Ok(())
}

/// Routes stdin lines until end of input (false) or Ctrl-C (true).
async fn read_host_messages(
    online_tx: &watch::Sender<bool>,
    signal_tx: &mpsc::Sender<BackgroundSignal>,
) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(true),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("host input closed");
            return Ok(false);
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match HostMessage::parse(line).map(HostMessage::route) {
            Ok(HostInput::Connectivity(online)) => {
                online_tx.send_replace(online);
            }
            Ok(HostInput::Signal(signal)) => {
                if signal_tx.send(signal).await.is_err() {
                    warn!("signal consumer stopped");
                    return Ok(false);
                }
            }
            Err(e) => warn!(error = %e, "ignoring host message"),
        }
    }
}

/// Forwards every status change to the host until the status board closes
/// or `cancel` fires after the last change was written.
///
/// The run marker follows `is_syncing` so `outbox status` in another process
/// sees runs, not just a live host.
async fn report_status(
    outbox: Arc<Outbox>,
    host: Arc<LineHost<Stdout>>,
    mut marker: RunMarker,
    cancel: CancellationToken,
) {
    let mut rx = outbox.subscribe();
    drop(outbox);
    loop {
        let status = rx.borrow_and_update().clone();
        if let Err(e) = marker.set(status.is_syncing) {
            warn!(error = %e, "could not update run marker");
        }
        if let Err(e) = host.write_status(&status) {
            warn!(error = %e, "could not report status");
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    if rx.has_changed().unwrap_or(false) {
        let status = rx.borrow_and_update().clone();
        if let Err(e) = marker.set(status.is_syncing) {
            warn!(error = %e, "could not update run marker");
        }
        if let Err(e) = host.write_status(&status) {
            warn!(error = %e, "could not report status");
        }
    }
}

/// Re-probes the remote on a fixed interval and publishes every reading.
///
/// Repeat readings are sent too: the engine may have marked the remote
/// unreachable since the last probe, and only a fresh `true` brings the
/// monitor back online.
async fn probe_loop(
    probe: Probe,
    period: Duration,
    online_tx: Arc<watch::Sender<bool>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes at once; the initial reading is already taken.
    interval.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                online_tx.send_replace(probe.check().await);
            }
        }
    }
}

async fn join(handle: Option<JoinHandle<()>>, name: &str) {
    if let Some(handle) = handle {
        if let Err(e) = handle.await {
            warn!(task = name, error = %e, "task failed");
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
