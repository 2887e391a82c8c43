// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use chrono::{DateTime, Utc};
use ob_core::{MutationFilter, MutationStatus, PendingMutation};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;

use super::{open_outbox, print_json};

/// Payload previews longer than this are cut.
const PREVIEW_WIDTH: usize = 60;

/// JSON representation of a mutation. The credential is never printed.
#[derive(Serialize)]
struct MutationJson<'a> {
    id: &'a str,
    resource_kind: &'a str,
    status: MutationStatus,
    attempts: u32,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_attempt_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<&'a str>,
    payload: &'a serde_json::Value,
}

impl<'a> From<&'a PendingMutation> for MutationJson<'a> {
    fn from(m: &'a PendingMutation) -> Self {
        MutationJson {
            id: &m.id,
            resource_kind: &m.resource_kind,
            status: m.status,
            attempts: m.attempts,
            created_at: m.created_at,
            next_attempt_at: m.next_attempt_at,
            last_error: m.last_error.as_deref(),
            payload: &m.payload,
        }
    }
}

pub fn run(
    dir: &Path,
    status: Option<String>,
    kind: Option<String>,
    output: OutputFormat,
) -> Result<()> {
    let mut filter = match status {
        Some(s) => MutationFilter::status(s.parse::<MutationStatus>()?),
        None => MutationFilter::all(),
    };
    if let Some(kind) = kind {
        filter = filter.kind(kind);
    }

    let outbox = open_outbox(dir, false)?;
    let mutations = outbox.list(&filter)?;

    match output {
        OutputFormat::Json => {
            let json: Vec<MutationJson> = mutations.iter().map(MutationJson::from).collect();
            print_json(&json)?;
        }
        OutputFormat::Text => {
            for m in &mutations {
                for line in format_mutation(m) {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}

/// Formats one mutation as a summary line plus an optional error line.
pub(crate) fn format_mutation(m: &PendingMutation) -> Vec<String> {
    let mut lines = vec![format!(
        "{} [{}] {} attempts={} {}",
        m.id,
        m.status,
        m.resource_kind,
        m.attempts,
        preview(&m.payload)
    )];
    if let Some(error) = &m.last_error {
        lines.push(format!("    error: {error}"));
    }
    lines
}

fn preview(payload: &serde_json::Value) -> String {
    let text = payload.to_string();
    if text.chars().count() <= PREVIEW_WIDTH {
        return text;
    }
    let cut: String = text.chars().take(PREVIEW_WIDTH - 3).collect();
    format!("{cut}...")
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
