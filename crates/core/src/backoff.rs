// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with jitter.
//!
//! `delay = min(ceiling, base * 2^attempt)`, then scaled by a uniform random
//! factor in `[jitter_floor, 1.0]` so that many clients losing the same
//! service do not reconnect in lockstep.

use rand::Rng;
use std::time::Duration;

use crate::error::{Error, Result};

/// Backoff policy shared by the reconnect loop and request retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base: Duration,
    ceiling: Duration,
    jitter_floor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: Duration::from_secs(1),
            ceiling: Duration::from_secs(30),
            jitter_floor: 0.8,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy.
    ///
    /// `jitter_floor` is the lower bound of the random scale factor and must
    /// lie in `(0.0, 1.0]`; `1.0` disables jitter.
    pub fn new(base: Duration, ceiling: Duration, jitter_floor: f64) -> Result<Self> {
        if base.is_zero() {
            return Err(Error::InvalidArgument(
                "backoff base delay must be greater than zero".to_string(),
            ));
        }
        if ceiling < base {
            return Err(Error::InvalidArgument(format!(
                "backoff ceiling ({:?}) must not be below the base delay ({:?})",
                ceiling, base
            )));
        }
        if !(jitter_floor > 0.0 && jitter_floor <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "backoff jitter floor must be in (0.0, 1.0], got {}",
                jitter_floor
            )));
        }
        Ok(BackoffPolicy {
            base,
            ceiling,
            jitter_floor,
        })
    }

    /// The delay for the first attempt, before jitter.
    pub fn base(&self) -> Duration {
        self.base
    }

    /// The upper bound of any delay.
    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// The un-jittered delay for `attempt`, capped at the ceiling.
    pub fn capped_delay(&self, attempt: u32) -> Duration {
        // 2^31 * base overflows long before any sane ceiling anyway
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.ceiling, |d| d.min(self.ceiling))
    }

    /// The delay to wait before attempt number `attempt` (0-based).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.next_delay_with(attempt, &mut rand::thread_rng())
    }

    /// Like [`next_delay`](Self::next_delay) with a caller-supplied RNG.
    pub fn next_delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let capped = self.capped_delay(attempt);
        if self.jitter_floor >= 1.0 {
            return capped;
        }
        let scale = rng.gen_range(self.jitter_floor..=1.0);
        capped.mul_f64(scale)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
