// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ob-core: Shared library for the outbox sync engine
//!
//! This crate provides the data model, the durable record store, and the sync
//! status state machine used by both the async engine and the `outbox` CLI.
//! Nothing here performs network I/O.

pub mod clock;
pub mod error;
pub mod id;
pub mod mutation;
pub mod status;
pub mod store;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use mutation::{MutationFilter, MutationStatus, PendingMutation};
pub use status::{transition, StatusEvent, SyncState, SyncStatus};
pub use store::{Draft, StorageStats, Store};
