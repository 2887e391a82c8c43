// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by `outbox` commands.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sync(#[from] ob_sync::Error),

    #[error("could not determine a state directory\n  hint: pass --dir or set OUTBOX_DIR")]
    NoStateDir,

    #[error("another outbox process is syncing {0}\n  hint: wait for it to finish or stop 'outbox run'")]
    Locked(String),

    #[error("no credential given\n  hint: pass --credential or set OUTBOX_CREDENTIAL")]
    MissingCredential,

    #[error("invalid JSON {what}: {reason}")]
    InvalidJson { what: &'static str, reason: String },

    #[error("draft not found: {0}")]
    DraftNotFound(String),

    #[error("{0} is required")]
    FieldRequired(&'static str),

    #[error("invalid remote url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ob_core::Error> for Error {
    fn from(e: ob_core::Error) -> Self {
        Error::Sync(ob_sync::Error::Store(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
