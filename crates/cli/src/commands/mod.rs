// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod draft;
pub mod enqueue;
pub mod list;
pub mod remediate;
pub mod run;
pub mod status;
pub mod sync;

use std::io::Read;
use std::path::Path;

use ob_sync::Outbox;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Cache key holding the summary of the last completed sync.
///
/// Each command is its own process, so `status` reads this to report the
/// outcome of an earlier `sync`.
pub(crate) const LAST_SYNC_KEY: &str = "outbox/last-sync";

/// Opens the outbox in `dir` without a background host.
pub(crate) fn open_outbox(dir: &Path, online: bool) -> Result<Outbox> {
    Ok(Outbox::open(dir, None, online)?)
}

/// Parses a JSON argument, reading stdin when it is `-`.
pub(crate) fn read_json(arg: &str, what: &'static str) -> Result<Value> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        arg.to_string()
    };
    parse_json(&text, what)
}

pub(crate) fn parse_json(text: &str, what: &'static str) -> Result<Value> {
    serde_json::from_str(text.trim()).map_err(|e| Error::InvalidJson {
        what,
        reason: e.to_string(),
    })
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
