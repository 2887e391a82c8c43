// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed persistent record store.
//!
//! The [`Store`] holds three independent collections:
//! - `mutations`: the outbox of [`PendingMutation`] records, keyed by id
//! - `drafts`: unsent form drafts, keyed by caller-chosen key
//! - `cache_entries`: read-through cache bodies with optional expiry
//!
//! Every call takes the connection lock for the duration of one statement (or
//! one short transaction) and returns owned values, so readers never observe a
//! half-written record while the sync engine is writing.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::id::generate_unique_id;
use crate::mutation::{MutationFilter, MutationStatus, PendingMutation};

/// SQL schema for the outbox database.
pub const SCHEMA: &str = r#"
-- Outbox of writes waiting for the remote API. seq preserves enqueue order.
CREATE TABLE IF NOT EXISTS mutations (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    resource_kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    credential TEXT NOT NULL,
    created_at TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    retry_floor INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    next_attempt_at TEXT
);

-- Unsent form drafts
CREATE TABLE IF NOT EXISTS drafts (
    key TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Cached remote reads
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    stored_at TEXT NOT NULL,
    expires_at_ms INTEGER
);

CREATE INDEX IF NOT EXISTS idx_mutations_status ON mutations(status);
CREATE INDEX IF NOT EXISTS idx_mutations_kind ON mutations(resource_kind);
CREATE INDEX IF NOT EXISTS idx_cache_expiry ON cache_entries(expires_at_ms);
"#;

const MUTATION_COLUMNS: &str = "id, resource_kind, payload, credential, created_at, attempts, \
     retry_floor, last_error, status, next_attempt_at";

/// Read-only counters over the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Pending and in-flight mutations.
    pub pending: usize,
    /// Mutations in `failed-permanent`.
    pub dead_letters: usize,
    /// Saved drafts.
    pub drafts: usize,
    /// Unexpired cache entries.
    pub cache_entries: usize,
}

/// A saved form draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub key: String,
    pub body: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid value '{value}' in column '{column}'"
            ))),
        )
    })
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

fn parse_json(value: &str, column: &str) -> std::result::Result<serde_json::Value, rusqlite::Error> {
    serde_json::from_str(value).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!("invalid JSON in column '{column}'"))),
        )
    })
}

fn row_to_mutation(row: &Row<'_>) -> std::result::Result<PendingMutation, rusqlite::Error> {
    let payload: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    let status: String = row.get(8)?;
    let next_attempt_at: Option<String> = row.get(9)?;
    Ok(PendingMutation {
        id: row.get(0)?,
        resource_kind: row.get(1)?,
        payload: parse_json(&payload, "payload")?,
        credential: row.get(3)?,
        created_at: parse_timestamp(&created_at, "created_at")?,
        attempts: row.get(5)?,
        retry_floor: row.get(6)?,
        last_error: row.get(7)?,
        status: parse_db(&status, "status")?,
        next_attempt_at: next_attempt_at
            .map(|s| parse_timestamp(&s, "next_attempt_at"))
            .transpose()?,
    })
}

/// Builds the WHERE clause and bound values for a filter.
fn filter_clause(filter: &MutationFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if !filter.statuses.is_empty() {
        let placeholders = vec!["?"; filter.statuses.len()].join(", ");
        clauses.push(format!("status IN ({placeholders})"));
        values.extend(filter.statuses.iter().map(|s| s.as_str().to_string()));
    }
    if let Some(kind) = &filter.resource_kind {
        clauses.push("resource_kind = ?".to_string());
        values.push(kind.clone());
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

/// Durable key-value storage for mutations, drafts, and cache entries.
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::StorageUnavailable(format!("{}: {e}", parent.display())))?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;

        Ok(Store {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a store that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Returns the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StorageUnavailable("store lock poisoned".to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates and persists a new pending mutation with a fresh, never-used id.
    pub fn insert_new(
        &self,
        resource_kind: &str,
        payload: serde_json::Value,
        credential: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PendingMutation> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let last_seq: Option<i64> = tx
            .query_row(
                "SELECT seq FROM sqlite_sequence WHERE name = 'mutations'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let next_seq = u64::try_from(last_seq.unwrap_or(0)).unwrap_or(0) + 1;

        let id = generate_unique_id(resource_kind, &created_at, next_seq, |candidate| {
            tx.query_row(
                "SELECT 1 FROM mutations WHERE id = ?1",
                params![candidate],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
        })?;

        let mutation = PendingMutation::new(
            id,
            resource_kind.to_string(),
            payload,
            credential.to_string(),
            created_at,
        );
        upsert(&tx, &mutation)?;
        tx.commit()?;
        Ok(mutation)
    }

    /// Writes a record, replacing any existing record with the same id.
    ///
    /// Replacing keeps the record's original queue position.
    pub fn put(&self, mutation: &PendingMutation) -> Result<()> {
        let conn = self.conn()?;
        upsert(&conn, mutation)
    }

    /// Reads one record by id.
    pub fn get(&self, id: &str) -> Result<Option<PendingMutation>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {MUTATION_COLUMNS} FROM mutations WHERE id = ?1");
        let mutation = conn
            .query_row(&sql, params![id], row_to_mutation)
            .optional()?;
        Ok(mutation)
    }

    /// Deletes one record. Returns false if it did not exist.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM mutations WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Lists records matching the filter in enqueue (FIFO) order.
    pub fn list(&self, filter: &MutationFilter) -> Result<Vec<PendingMutation>> {
        let conn = self.conn()?;
        let (clause, values) = filter_clause(filter);
        let sql = format!("SELECT {MUTATION_COLUMNS} FROM mutations{clause} ORDER BY seq ASC");
        let mut stmt = conn.prepare(&sql)?;
        let mutations = stmt
            .query_map(params_from_iter(values.iter()), row_to_mutation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(mutations)
    }

    /// Counts records matching the filter.
    pub fn count(&self, filter: &MutationFilter) -> Result<usize> {
        let conn = self.conn()?;
        let (clause, values) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM mutations{clause}");
        let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Reverts records stranded in `in-flight` (by a crash mid-delivery) to `pending`.
    ///
    /// Returns the number of records reverted.
    pub fn reset_in_flight(&self) -> Result<usize> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE mutations SET status = ?1 WHERE status = ?2",
            params![
                MutationStatus::Pending.as_str(),
                MutationStatus::InFlight.as_str()
            ],
        )?;
        Ok(affected)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Drafts
    // ─────────────────────────────────────────────────────────────────────────

    /// Saves (or overwrites) a draft.
    pub fn save_draft(&self, key: &str, body: &serde_json::Value, now: DateTime<Utc>) -> Result<()> {
        if key.trim().is_empty() {
            return Err(Error::InvalidInput("draft key cannot be empty".to_string()));
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO drafts (key, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![key, serde_json::to_string(body)?, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Loads a draft by key.
    pub fn load_draft(&self, key: &str) -> Result<Option<Draft>> {
        let conn = self.conn()?;
        let draft = conn
            .query_row(
                "SELECT key, body, updated_at FROM drafts WHERE key = ?1",
                params![key],
                row_to_draft,
            )
            .optional()?;
        Ok(draft)
    }

    /// Deletes a draft. Returns false if it did not exist.
    pub fn delete_draft(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM drafts WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    /// Lists all drafts, most recently updated first.
    pub fn list_drafts(&self) -> Result<Vec<Draft>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT key, body, updated_at FROM drafts ORDER BY updated_at DESC, key")?;
        let drafts = stmt
            .query_map([], row_to_draft)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(drafts)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cache
    // ─────────────────────────────────────────────────────────────────────────

    /// Stores a cache entry. `ttl` of `None` never expires.
    pub fn cache_put(
        &self,
        key: &str,
        body: &serde_json::Value,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let expires_at_ms = ttl.map(|ttl| {
            now.timestamp_millis()
                .saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
        });
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO cache_entries (key, body, stored_at, expires_at_ms) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                stored_at = excluded.stored_at,
                expires_at_ms = excluded.expires_at_ms",
            params![key, serde_json::to_string(body)?, now.to_rfc3339(), expires_at_ms],
        )?;
        Ok(())
    }

    /// Reads a cache entry. Expired entries read as absent.
    pub fn cache_get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<serde_json::Value>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM cache_entries
                 WHERE key = ?1 AND (expires_at_ms IS NULL OR expires_at_ms > ?2)",
                params![key, now.timestamp_millis()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| serde_json::from_str(&b).map_err(Error::from))
            .transpose()
    }

    /// Removes expired cache entries. Returns the number removed.
    pub fn cache_purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(affected)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stats
    // ─────────────────────────────────────────────────────────────────────────

    /// Aggregates counters in a single read.
    pub fn stats(&self, now: DateTime<Utc>) -> Result<StorageStats> {
        let conn = self.conn()?;
        let (pending, dead_letters, drafts, cache_entries): (i64, i64, i64, i64) = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM mutations WHERE status IN (?1, ?2)),
                (SELECT COUNT(*) FROM mutations WHERE status = ?3),
                (SELECT COUNT(*) FROM drafts),
                (SELECT COUNT(*) FROM cache_entries
                    WHERE expires_at_ms IS NULL OR expires_at_ms > ?4)",
            params![
                MutationStatus::Pending.as_str(),
                MutationStatus::InFlight.as_str(),
                MutationStatus::FailedPermanent.as_str(),
                now.timestamp_millis()
            ],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        Ok(StorageStats {
            pending: usize::try_from(pending).unwrap_or(0),
            dead_letters: usize::try_from(dead_letters).unwrap_or(0),
            drafts: usize::try_from(drafts).unwrap_or(0),
            cache_entries: usize::try_from(cache_entries).unwrap_or(0),
        })
    }
}

fn upsert(conn: &Connection, mutation: &PendingMutation) -> Result<()> {
    conn.execute(
        "INSERT INTO mutations (id, resource_kind, payload, credential, created_at, attempts,
                                retry_floor, last_error, status, next_attempt_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            resource_kind = excluded.resource_kind,
            payload = excluded.payload,
            credential = excluded.credential,
            created_at = excluded.created_at,
            attempts = excluded.attempts,
            retry_floor = excluded.retry_floor,
            last_error = excluded.last_error,
            status = excluded.status,
            next_attempt_at = excluded.next_attempt_at",
        params![
            mutation.id,
            mutation.resource_kind,
            serde_json::to_string(&mutation.payload)?,
            mutation.credential,
            mutation.created_at.to_rfc3339(),
            mutation.attempts,
            mutation.retry_floor,
            mutation.last_error,
            mutation.status.as_str(),
            mutation.next_attempt_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn row_to_draft(row: &Row<'_>) -> std::result::Result<Draft, rusqlite::Error> {
    let body: String = row.get(1)?;
    let updated_at: String = row.get(2)?;
    Ok(Draft {
        key: row.get(0)?,
        body: parse_json(&body, "body")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
    })
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
