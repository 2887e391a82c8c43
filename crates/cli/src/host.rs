// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented host channel used by `outbox run`.
//!
//! The embedding host writes one JSON object per line to our stdin:
//!
//! ```text
//! {"type":"online"}
//! {"type":"offline"}
//! {"type":"sync-started"}
//! {"type":"item-synced","success":true}
//! {"type":"sync-completed","error":null}
//! ```
//!
//! Background-sync registrations and status changes go the other way, one
//! line each:
//!
//! ```text
//! {"type":"request-background-sync","tag":"outbox-sync"}
//! {"type":"status","state":"connected-idle","is_online":true,...}
//! ```

use std::io::Write;
use std::sync::Mutex;

use ob_core::SyncStatus;
use ob_sync::{BackgroundHost, BackgroundSignal, HostError};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One inbound line from the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    Online,
    Offline,
    SyncStarted,
    ItemSynced {
        success: bool,
    },
    SyncCompleted {
        #[serde(default)]
        error: Option<String>,
    },
}

/// Where an inbound message is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostInput {
    Connectivity(bool),
    Signal(BackgroundSignal),
}

impl HostMessage {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::InvalidJson {
            what: "host message",
            reason: e.to_string(),
        })
    }

    pub fn route(self) -> HostInput {
        match self {
            HostMessage::Online => HostInput::Connectivity(true),
            HostMessage::Offline => HostInput::Connectivity(false),
            HostMessage::SyncStarted => HostInput::Signal(BackgroundSignal::SyncStarted),
            HostMessage::ItemSynced { success } => {
                HostInput::Signal(BackgroundSignal::ItemSynced { success })
            }
            HostMessage::SyncCompleted { error } => {
                HostInput::Signal(BackgroundSignal::SyncCompleted { error })
            }
        }
    }
}

#[derive(Serialize)]
struct Registration<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    tag: &'a str,
}

#[derive(Serialize)]
struct StatusLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    status: &'a SyncStatus,
}

/// Background host that writes registrations as JSON lines.
pub struct LineHost<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> LineHost<W> {
    pub fn new(out: W) -> Self {
        LineHost {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> LineHost<W> {
    /// Reports a status change to the host.
    pub fn write_status(&self, status: &SyncStatus) -> std::result::Result<(), HostError> {
        self.write_line(&StatusLine {
            kind: "status",
            status,
        })
    }

    fn write_line<T: Serialize>(&self, value: &T) -> std::result::Result<(), HostError> {
        let line = serde_json::to_string(value).map_err(|e| HostError(e.to_string()))?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| HostError("host channel poisoned".to_string()))?;
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| HostError(e.to_string()))
    }
}

impl<W: Write + Send> BackgroundHost for LineHost<W> {
    fn request_background_sync(&self, tag: &str) -> std::result::Result<(), HostError> {
        self.write_line(&Registration {
            kind: "request-background-sync",
            tag,
        })
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
