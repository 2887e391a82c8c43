// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Prefix shared by every mutation ID.
pub const ID_PREFIX: &str = "mut";

/// Generate a mutation ID from resource kind, enqueue time, and store sequence.
/// Format: mut-{hash} where hash is the first 12 hex chars of
/// SHA256(kind + timestamp_nanos + sequence).
pub fn generate_id(resource_kind: &str, created_at: &DateTime<Utc>, sequence: u64) -> String {
    let nanos = created_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| created_at.timestamp_millis());
    let input = format!("{resource_kind}\u{1f}{nanos}\u{1f}{sequence}");
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..6]);
    format!("{ID_PREFIX}-{short_hash}")
}

/// Generate a unique ID, handling collisions by appending incrementing suffix.
///
/// An error from `exists` stops the search and is returned as is.
pub fn generate_unique_id<F, E>(
    resource_kind: &str,
    created_at: &DateTime<Utc>,
    sequence: u64,
    exists: F,
) -> Result<String, E>
where
    F: Fn(&str) -> Result<bool, E>,
{
    let base_id = generate_id(resource_kind, created_at, sequence);

    if !exists(&base_id)? {
        return Ok(base_id);
    }

    let mut suffix = 2;
    loop {
        let id = format!("{base_id}-{suffix}");
        if !exists(&id)? {
            return Ok(id);
        }
        suffix += 1;
    }
}

/// Validate a resource kind tag (non-empty, lowercase alphanumeric plus `-`, `_`, `/`).
pub fn validate_resource_kind(kind: &str) -> bool {
    !kind.is_empty()
        && !kind.starts_with('/')
        && kind
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '/'))
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
