// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff for transient delivery failures.

use std::time::Duration;

use crate::config::RetryConfig;

/// Delay before the next attempt after `failures` consecutive transient failures.
///
/// `initial * 2^(failures - 1)`, capped at `max`. Zero failures means no delay.
pub fn backoff_delay(failures: u32, initial: Duration, max: Duration) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let exponent = failures.saturating_sub(1).min(31);
    let factor = 1u32 << exponent;
    initial.saturating_mul(factor).min(max)
}

impl RetryConfig {
    /// Backoff delay under this policy.
    pub fn delay_for(&self, failures: u32) -> Duration {
        backoff_delay(failures, self.initial_backoff(), self.max_backoff())
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
