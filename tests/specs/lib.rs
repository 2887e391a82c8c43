// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Behavioral specs for the `outbox` binary.
//!
//! The files under `cli/` are compiled as integration tests of the
//! `outbox` package (see its `[[test]]` entries) so they can run the built
//! binary through `assert_cmd`.
