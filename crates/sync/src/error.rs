// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync engine.

use thiserror::Error;

/// Errors surfaced by engine entry points.
///
/// Per-record delivery failures are not errors: they are recorded on the
/// record and summarized in [`SyncReport`](crate::SyncReport).
#[derive(Debug, Error)]
pub enum Error {
    /// Store failure (including `StorageUnavailable`).
    #[error(transparent)]
    Store(#[from] ob_core::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid resource kind: '{0}'\n  hint: use lowercase letters, digits, '-', '_' or '/'")]
    InvalidResourceKind(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl Error {
    /// Returns true if the backing store could not be read or written.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Error::Store(e) if e.is_storage_unavailable())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
