// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::error::{Error, Result};
use crate::state::SyncLock;

use super::open_outbox;

/// Requeues one dead letter, or all of them with `all`.
pub async fn retry(dir: &Path, id: Option<String>, all: bool) -> Result<()> {
    let _lock = SyncLock::acquire(dir)?;
    let outbox = open_outbox(dir, false)?;
    match (id, all) {
        (_, true) => {
            let count = outbox.retry_all().await?;
            println!("Requeued {count} dead letter(s)");
        }
        (Some(id), false) => {
            let mutation = outbox.retry(&id).await?;
            println!("Requeued {}", mutation.id);
        }
        (None, false) => return Err(Error::FieldRequired("a mutation ID or --all")),
    }
    Ok(())
}

/// Deletes one dead letter.
pub async fn discard(dir: &Path, id: &str) -> Result<()> {
    let _lock = SyncLock::acquire(dir)?;
    let outbox = open_outbox(dir, false)?;
    let mutation = outbox.discard(id).await?;
    println!("Discarded {}", mutation.id);
    Ok(())
}
