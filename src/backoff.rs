//! Incremental backoff between feed connection attempts.
//!
//! A single [`Backoff`] is owned by the feed client, so a failure on the
//! station-information path also lengthens the next wait on the
//! station-status path. Success never resets it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// First wait, in seconds.
pub const BASE_WAIT_SECS: f64 = 19.3;
/// Ceiling for the un-jittered wait, in seconds.
pub const MAX_WAIT_SECS: f64 = 30.0;
/// Growth factor applied to the base after every yield.
pub const GROWTH: f64 = 1.5;

/// Whether a failing call is retried indefinitely or gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Keep retrying until the call succeeds.
    #[default]
    Forever,
    /// Give up after this many failed attempts.
    MaxAttempts(u32),
}

impl RetryPolicy {
    /// Returns `true` if another attempt is allowed after `failures` failed ones.
    pub fn allows_retry(&self, failures: u32) -> bool {
        match self {
            RetryPolicy::Forever => true,
            RetryPolicy::MaxAttempts(max) => failures < *max,
        }
    }

    /// `0` means "never give up", matching the CLI convention.
    pub fn from_max_attempts(max: u32) -> Self {
        if max == 0 {
            RetryPolicy::Forever
        } else {
            RetryPolicy::MaxAttempts(max)
        }
    }
}

/// Jittered, capped, geometrically growing delay generator.
///
/// The first delay is exactly [`BASE_WAIT_SECS`]. After each yield the wait
/// becomes `min(wait × 1.5, 30s) × jitter`, jitter in `[1.00, 1.50]` (1% steps).
pub struct Backoff {
    wait_secs: f64,
    rng: StdRng,
}

impl Backoff {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic jitter for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            wait_secs: BASE_WAIT_SECS,
            rng,
        }
    }

    /// The delay the next call to [`Backoff::next_delay`] will yield.
    pub fn peek(&self) -> Duration {
        Duration::from_secs_f64(self.wait_secs)
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.wait_secs;
        let jitter = f64::from(100 + self.rng.gen_range(0..=50u32)) / 100.0;
        self.wait_secs = (self.wait_secs * GROWTH).min(MAX_WAIT_SECS) * jitter;
        Duration::from_secs_f64(delay)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
