//! Retry floor for the primary monitor's consumer loop

use std::time::Duration;

/// Exponential backoff with jitter, applied only to consecutive failures
///
/// The first failure after a success gets no delay at all, so an isolated
/// disconnect is retried immediately.
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    failures: u32,
}

impl Backoff {
    /// Create a new backoff starting at `base_ms` with a cap of `max_ms`.
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before the next attempt.
    pub fn on_failure(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self.failures == 1 {
            return None;
        }

        let exp = self
            .base_ms
            .saturating_mul(1u64.checked_shl(self.failures - 2).unwrap_or(u64::MAX));
        let capped = exp.min(self.max_ms);
        let jitter = rand::random::<u64>() % (capped / 4 + 1);
        Some(Duration::from_millis(capped + jitter))
    }

    /// Reset after a successful read.
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}
