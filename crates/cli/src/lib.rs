// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbox - command-line front end for the offline write queue.
//!
//! Each subcommand opens the queue in the state directory (`--dir`,
//! `$OUTBOX_DIR`, or the user data directory), does its work, and exits.
//! `outbox run` instead stays up as a host process, reading connectivity and
//! background signals as JSON lines on stdin.
//!
//! # State directory
//!
//! ```text
//! <dir>/
//!   config.toml   remote URL, endpoints, retry policy
//!   outbox.db     queue, drafts, and cache (SQLite)
//!   sync.lock     held while a process is syncing
//!   outbox.log    log file for `outbox run`
//! ```

mod cli;
mod commands;
pub mod env;
pub mod error;
pub mod host;
mod logging;
pub mod probe;
pub mod state;

use std::path::PathBuf;

pub use cli::{Cli, Command, DraftCommand, OutputFormat};
pub use error::{Error, Result};

/// Runs one parsed command line to completion.
pub fn run(cli: Cli) -> Result<()> {
    let dir = state::ensure_dir(cli.dir.as_deref())?;
    match cli.command {
        Command::Run { .. } => logging::init_file(&dir.join(state::LOG_FILE_NAME)),
        _ => logging::init_stderr(),
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute(cli.command, dir))
}

async fn execute(command: Command, dir: PathBuf) -> Result<()> {
    match command {
        Command::Enqueue {
            kind,
            payload,
            credential,
        } => commands::enqueue::run(&dir, &kind, &payload, credential),
        Command::List {
            status,
            kind,
            output,
        } => commands::list::run(&dir, status, kind, output),
        Command::Retry { id, all } => commands::remediate::retry(&dir, id, all).await,
        Command::Discard { id } => commands::remediate::discard(&dir, &id).await,
        Command::Sync {
            assume_online,
            output,
        } => commands::sync::run(&dir, assume_online, output).await,
        Command::Status { probe, output } => commands::status::status(&dir, probe, output).await,
        Command::Stats { output } => commands::status::stats(&dir, output),
        Command::Run { probe } => commands::run::run(&dir, probe).await,
        Command::Draft(command) => commands::draft::run(&dir, command),
    }
}
