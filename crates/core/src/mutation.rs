// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued write operations and their delivery lifecycle.
//!
//! A [`PendingMutation`] is created by [`PendingMutation::new`] at enqueue time
//! and moves `pending → in-flight → (deleted | pending | failed-permanent)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Delivery status of a queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationStatus {
    /// Waiting for the next sync run.
    Pending,
    /// Handed to the transport by the current sync run.
    InFlight,
    /// Dead-lettered: excluded from automatic retry until requeued by hand.
    FailedPermanent,
}

impl MutationStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationStatus::Pending => "pending",
            MutationStatus::InFlight => "in-flight",
            MutationStatus::FailedPermanent => "failed-permanent",
        }
    }

    /// Statuses that still count toward the sync queue.
    pub fn active() -> [MutationStatus; 2] {
        [MutationStatus::Pending, MutationStatus::InFlight]
    }
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MutationStatus::Pending),
            "in-flight" | "in_flight" | "inflight" => Ok(MutationStatus::InFlight),
            "failed-permanent" | "failed_permanent" | "failed" | "dead" => {
                Ok(MutationStatus::FailedPermanent)
            }
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// A write destined for the remote API, persisted until acknowledged.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    /// Unique identifier (format: `mut-{hash}`), never reused.
    pub id: String,
    /// Tag selecting the remote endpoint the payload targets.
    pub resource_kind: String,
    /// JSON body sent verbatim to the remote API.
    pub payload: serde_json::Value,
    /// Authorization value captured at enqueue time.
    #[serde(skip_serializing, default)]
    pub credential: String,
    /// When the mutation was enqueued.
    pub created_at: DateTime<Utc>,
    /// Delivery attempts so far. Never decreases.
    pub attempts: u32,
    /// Value of `attempts` when the current retry budget began.
    #[serde(default)]
    pub retry_floor: u32,
    /// Most recent failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Current delivery status.
    pub status: MutationStatus,
    /// Earliest time the next automatic attempt may happen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl PendingMutation {
    /// Creates a fresh pending mutation.
    pub fn new(
        id: String,
        resource_kind: String,
        payload: serde_json::Value,
        credential: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        PendingMutation {
            id,
            resource_kind,
            payload,
            credential,
            created_at,
            attempts: 0,
            retry_floor: 0,
            last_error: None,
            status: MutationStatus::Pending,
            next_attempt_at: None,
        }
    }

    /// Attempts made since the current retry budget began.
    pub fn budget_used(&self) -> u32 {
        self.attempts.saturating_sub(self.retry_floor)
    }

    /// Returns true if the record may be attempted at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == MutationStatus::Pending && self.next_attempt_at.is_none_or(|at| at <= now)
    }

    /// Returns true if the record is dead-lettered.
    pub fn is_dead_letter(&self) -> bool {
        self.status == MutationStatus::FailedPermanent
    }
}

// Credentials must never reach logs.
impl fmt::Debug for PendingMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMutation")
            .field("id", &self.id)
            .field("resource_kind", &self.resource_kind)
            .field("payload", &self.payload)
            .field("credential", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("attempts", &self.attempts)
            .field("retry_floor", &self.retry_floor)
            .field("last_error", &self.last_error)
            .field("status", &self.status)
            .field("next_attempt_at", &self.next_attempt_at)
            .finish()
    }
}

/// Selects records for [`Store::list`](crate::Store::list) and
/// [`Store::count`](crate::Store::count).
///
/// An empty status set matches every status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationFilter {
    pub statuses: Vec<MutationStatus>,
    pub resource_kind: Option<String>,
}

impl MutationFilter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches records with exactly this status.
    pub fn status(status: MutationStatus) -> Self {
        MutationFilter {
            statuses: vec![status],
            resource_kind: None,
        }
    }

    /// Matches pending and in-flight records.
    pub fn active() -> Self {
        MutationFilter {
            statuses: MutationStatus::active().to_vec(),
            resource_kind: None,
        }
    }

    /// Restricts the filter to one resource kind.
    pub fn kind(mut self, resource_kind: impl Into<String>) -> Self {
        self.resource_kind = Some(resource_kind.into());
        self
    }

    /// Returns true if the record passes this filter.
    pub fn matches(&self, mutation: &PendingMutation) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&mutation.status))
            && self
                .resource_kind
                .as_ref()
                .is_none_or(|kind| *kind == mutation.resource_kind)
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
