// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Split CLI parsing tests, one file per command group.

use super::*;

mod draft_tests;
