// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::env;
use crate::error::{Error, Result};

use super::{open_outbox, read_json};

/// Picks the credential from the flag, then the environment.
pub(crate) fn resolve_credential(flag: Option<String>) -> Result<String> {
    flag.filter(|c| !c.trim().is_empty())
        .or_else(env::credential)
        .ok_or(Error::MissingCredential)
}

pub fn run(dir: &Path, kind: &str, payload: &str, credential: Option<String>) -> Result<()> {
    let credential = resolve_credential(credential)?;
    let payload = read_json(payload, "payload")?;

    // Enqueue never touches the network, so start offline.
    let outbox = open_outbox(dir, false)?;
    let id = outbox.enqueue(kind, payload, &credential)?;
    println!("{id}");
    Ok(())
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
