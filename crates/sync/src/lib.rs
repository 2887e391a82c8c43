// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ob-sync: offline write queue reconciliation.
//!
//! Mutations are queued durably in the [`ob_core::Store`] and delivered to the
//! remote API when the host is online.
//!
//! # Architecture
//!
//! ```text
//!  host reachability ─► ┌──────────────┐
//!                       │ Connectivity │──Online──┐
//!                       │   Monitor    │          │
//!                       └──────────────┘          ▼
//!  background facility ─► ┌────────────┐   ┌──────────────┐    ┌───────────┐
//!                         │ Background │──►│  Reconciler  │───►│ Transport │──► remote
//!                         │ Coordinator│   │ (sync lock)  │    │  (trait)  │
//!                         └────────────┘   └──────────────┘    └───────────┘
//!                               │                 │
//!                               ▼                 ▼
//!                         ┌────────────┐    ┌──────────┐    ┌─────────────────┐
//!                         │StatusBoard │◄───│  Store   │───►│ StatsAggregator │
//!                         │  (watch)   │    │ (SQLite) │    │ (last good)     │
//!                         └────────────┘    └──────────┘    └─────────────────┘
//! ```
//!
//! # Features
//!
//! - FIFO delivery, one request in flight at a time
//! - Bounded retry with exponential backoff; 4xx rejections are dead-lettered at once
//! - At most one sync run per process; extra triggers are coalesced
//! - Status observable through a `watch` channel
//! - Injectable transport, background host, and clock for testing

mod backoff;
pub mod background;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod outbox;
pub mod stats;
pub mod status_board;
pub mod transport;
mod workers;

pub use background::{BackgroundHost, BackgroundSignal, HostError, SignalOutcome};
pub use backoff::backoff_delay;
pub use config::Config;
pub use connectivity::{ConnectivityEvent, ConnectivityMonitor};
pub use engine::{Reconciler, SkipReason, SyncReport};
pub use error::{Error, Result};
pub use outbox::{Outbox, OutboxBuilder, WorkerInputs, Workers, STORE_FILE_NAME};
pub use stats::StatsAggregator;
pub use status_board::StatusBoard;
pub use transport::{HttpTransport, Transport, TransportError};

#[cfg(test)]
mod test_helpers;
