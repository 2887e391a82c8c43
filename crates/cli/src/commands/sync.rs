// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use chrono::{DateTime, Utc};
use ob_sync::{Config, Outbox, SkipReason, SyncReport};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::probe::Probe;
use crate::state::{RunMarker, SyncLock};

use super::{print_json, LAST_SYNC_KEY};

/// Outcome of the last completed sync, kept in the store's cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LastSync {
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<String>,
    pub report: SyncReport,
}

pub async fn run(dir: &Path, assume_online: bool, output: OutputFormat) -> Result<()> {
    let _lock = SyncLock::acquire(dir)?;
    let config = Config::load(dir)?;

    let online = if assume_online {
        true
    } else {
        Probe::for_url(&config.remote.url, config.connectivity.probe_timeout())?
            .check()
            .await
    };

    let outbox = Outbox::open_with_config(dir, config, None, online)?;
    let mut marker = RunMarker::new(dir);
    marker.set(true)?;
    let report = outbox.run_sync().await?;
    marker.set(false)?;
    remember(&outbox, &report);

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => println!("{}", format_report(&report)),
    }
    Ok(())
}

/// Stores the run summary for later `status` calls. Skipped runs are not recorded.
pub(crate) fn remember(outbox: &Outbox, report: &SyncReport) {
    if report.skipped.is_some() {
        return;
    }
    if let Err(e) = store_last_sync(outbox, report) {
        warn!(error = %e, "could not record last sync");
    }
}

fn store_last_sync(outbox: &Outbox, report: &SyncReport) -> Result<()> {
    let status = outbox.sync_status();
    let Some(at) = status.last_sync_at else {
        return Ok(());
    };
    let last = LastSync {
        at,
        error: status.last_error,
        report: report.clone(),
    };
    outbox.cache_put(LAST_SYNC_KEY, &serde_json::to_value(&last)?, None)?;
    Ok(())
}

/// Reads the summary written by [`remember`].
pub(crate) fn last_sync(outbox: &Outbox) -> Option<LastSync> {
    let value = match outbox.cache_get(LAST_SYNC_KEY) {
        Ok(value) => value?,
        Err(e) => {
            warn!(error = %e, "could not read last sync");
            return None;
        }
    };
    serde_json::from_value(value).ok()
}

pub(crate) fn format_report(report: &SyncReport) -> String {
    match report.skipped {
        Some(SkipReason::Offline) => format!(
            "Remote unreachable, nothing sent ({} pending)",
            report.remaining
        ),
        Some(SkipReason::AlreadyRunning) => format!(
            "Sync already running ({} pending)",
            report.remaining
        ),
        None => format!(
            "Delivered {}, dead-lettered {}, remaining {}",
            report.delivered, report.failed_permanent, report.remaining
        ),
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
