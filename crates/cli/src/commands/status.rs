// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `outbox status` and `outbox stats`.
//!
//! Each CLI invocation is a fresh process, so the status shown here is
//! rebuilt from the store, the run marker, and the last recorded sync.

use std::path::Path;

use chrono::{DateTime, Utc};
use ob_core::{transition, StatusEvent, StorageStats, SyncState};
use ob_sync::Config;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::probe::Probe;
use crate::state::RunMarker;

use super::sync::last_sync;
use super::{open_outbox, print_json};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct StatusView {
    /// Unknown unless the remote was probed.
    pub state: Option<SyncState>,
    pub is_online: Option<bool>,
    pub is_syncing: bool,
    pub pending_count: usize,
    pub dead_letter_count: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub async fn status(dir: &Path, probe: bool, output: OutputFormat) -> Result<()> {
    let online = if probe {
        let config = Config::load(dir)?;
        let probe = Probe::for_url(&config.remote.url, config.connectivity.probe_timeout())?;
        Some(probe.check().await)
    } else {
        None
    };

    let outbox = open_outbox(dir, online.unwrap_or(false))?;
    let current = outbox.sync_status();
    let last = last_sync(&outbox);
    let is_syncing = RunMarker::is_held(dir);

    let view = StatusView {
        state: online.map(|online| {
            derive_state(online, is_syncing, current.dead_letter_count)
        }),
        is_online: online,
        is_syncing,
        pending_count: current.pending_count,
        dead_letter_count: current.dead_letter_count,
        last_sync_at: last.as_ref().map(|l| l.at),
        last_error: last.and_then(|l| l.error),
    };

    match output {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Text => {
            for line in format_status(&view) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub fn stats(dir: &Path, output: OutputFormat) -> Result<()> {
    let outbox = open_outbox(dir, false)?;
    let stats = outbox.stats();
    match output {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Text => {
            for line in format_stats(&stats) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Replays the state machine to the state a live process would show.
pub(crate) fn derive_state(online: bool, syncing: bool, dead_letters: usize) -> SyncState {
    let mut state = SyncState::initial(online);
    if dead_letters > 0 {
        state = transition(state, StatusEvent::SyncStarted);
        state = transition(state, StatusEvent::SyncFinished { dead_letters });
    }
    if syncing {
        state = transition(state, StatusEvent::SyncStarted);
    }
    state
}

pub(crate) fn format_status(view: &StatusView) -> Vec<String> {
    let state = match view.state {
        Some(state) => state.to_string(),
        None => "unknown (use --probe)".to_string(),
    };
    let mut lines = vec![
        format!("State: {state}"),
        format!("Pending: {}", view.pending_count),
        format!("Dead letters: {}", view.dead_letter_count),
        format!("Syncing: {}", if view.is_syncing { "yes" } else { "no" }),
    ];
    match view.last_sync_at {
        Some(at) => lines.push(format!("Last sync: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))),
        None => lines.push("Last sync: never".to_string()),
    }
    if let Some(error) = &view.last_error {
        lines.push(format!("Last error: {error}"));
    }
    lines
}

pub(crate) fn format_stats(stats: &StorageStats) -> Vec<String> {
    vec![
        format!("Pending: {}", stats.pending),
        format!("Dead letters: {}", stats.dead_letters),
        format!("Drafts: {}", stats.drafts),
        format!("Cache entries: {}", stats.cache_entries),
    ]
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
