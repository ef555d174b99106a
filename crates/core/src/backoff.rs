// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff for failed deliveries.
//!
//! The delay doubles with every failure of the same record, starting from
//! `base` and capped at `max`. Delays strictly increase only until they reach
//! the cap; from then on every retry waits `max`. A record is retried at most
//! `max_attempts` times, so it is sent at most `max_attempts + 1` times.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Retry policy applied to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Retries allowed after the first failed send.
    pub max_attempts: u32,
}

/// What to do with a record after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again no earlier than the given time.
    RetryAt(DateTime<Utc>),
    /// The retry budget is spent.
    Exhausted { attempts: u32 },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: Duration::from_secs(1),
            max: Duration::from_secs(300),
            max_attempts: 30,
        }
    }
}

impl BackoffPolicy {
    /// Returns the delay after the `failures`-th failed attempt (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        std::cmp::min(self.base.saturating_mul(factor), self.max)
    }

    /// Decides the fate of a record that has now failed `failures` times.
    pub fn decide(&self, failures: u32, now: DateTime<Utc>) -> RetryDecision {
        if failures > self.max_attempts {
            return RetryDecision::Exhausted { attempts: failures };
        }
        let delay = self.delay_for(failures);
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
        let at = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
        RetryDecision::RetryAt(at)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
