// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "outbox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline write queue with background sync to a remote API")]
#[command(
    long_about = "Offline write queue with background sync to a remote API.\n\n\
    Writes are queued durably and delivered in order when the remote is reachable. \
    Rejected writes are kept as dead letters for inspection, retry, or discard."
)]
pub struct Cli {
    /// State directory (default: $OUTBOX_DIR, then the user data dir)
    #[arg(long, global = true, value_name = "path")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Queue
    // ─────────────────────────────────────────────────────────────────────────
    /// Queue a mutation for delivery
    #[command(after_help = "\
Examples:
  outbox enqueue notes '{\"patient\":7}' -c 'Bearer tok'   Queue a note
  echo '{\"x\":1}' | outbox enqueue audit -                   Read payload from stdin")]
    Enqueue {
        /// Resource kind (selects the remote endpoint)
        #[arg(value_parser = non_empty_string)]
        kind: String,

        /// JSON payload, or '-' to read it from stdin
        payload: String,

        /// Authorization header value (default: $OUTBOX_CREDENTIAL)
        #[arg(long, short)]
        credential: Option<String>,
    },

    /// List queued mutations in delivery order
    List {
        /// Filter by status (pending, in-flight, failed-permanent)
        #[arg(long, short)]
        status: Option<String>,

        /// Filter by resource kind
        #[arg(long, short)]
        kind: Option<String>,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Requeue dead-lettered mutations with a fresh retry budget
    #[command(arg_required_else_help = true)]
    Retry {
        /// Mutation ID
        #[arg(conflicts_with = "all")]
        id: Option<String>,

        /// Requeue every dead letter
        #[arg(long)]
        all: bool,
    },

    /// Delete a dead-lettered mutation
    Discard {
        /// Mutation ID
        id: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────
    /// Run one sync pass now
    Sync {
        /// Skip the reachability probe and assume the remote is reachable
        #[arg(long)]
        assume_online: bool,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show sync status
    Status {
        /// Probe the remote to report connectivity
        #[arg(long)]
        probe: bool,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show storage counters
    Stats {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Run as a long-lived host process (JSON lines on stdin/stdout)
    #[command(after_help = "\
Stdin messages (one JSON object per line):
  {\"type\":\"online\"}  {\"type\":\"offline\"}  {\"type\":\"sync-started\"}
  {\"type\":\"item-synced\",\"success\":true}  {\"type\":\"sync-completed\",\"error\":null}

Logs go to <dir>/outbox.log. Exits on end of input or Ctrl-C.")]
    Run {
        /// Probe the remote on the configured interval
        #[arg(long)]
        probe: bool,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Drafts
    // ─────────────────────────────────────────────────────────────────────────
    /// Manage saved drafts
    #[command(subcommand)]
    Draft(DraftCommand),
}

#[derive(Subcommand)]
pub enum DraftCommand {
    /// Save (or overwrite) a draft
    Save {
        #[arg(value_parser = non_empty_string)]
        key: String,
        /// JSON body, or '-' to read it from stdin
        body: String,
    },
    /// Print a draft's body
    Show { key: String },
    /// Delete a draft
    Rm { key: String },
    /// List drafts, newest first
    List {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
