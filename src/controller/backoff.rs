//! # Error Back-off
//!
//! Per-resource exponential back-off applied by the error policy: the first
//! retry waits `base`, each further consecutive error doubles the wait up to
//! `max`. A successful tick resets the sequence.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    /// Wait before the next retry, advancing the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let delay = Self::delay_for_attempt(self.attempt, self.base, self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay for the `attempt`-th consecutive error (0-indexed)
    pub fn delay_for_attempt(attempt: u32, base: Duration, max: Duration) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        base.checked_mul(factor).unwrap_or(max).min(max)
    }
}

/// Back-off state of one resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            backoff: ExponentialBackoff::new(base, max),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_cap() {
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(5), Duration::from_secs(60));
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_backoff().as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 60, 60]);
    }

    #[test]
    fn test_reset_starts_over() {
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(5), Duration::from_secs(300));
        backoff.next_backoff();
        backoff.next_backoff();
        backoff.reset();
        assert_eq!(backoff.next_backoff(), Duration::from_secs(5));
    }

    #[test]
    fn test_large_attempt_saturates_at_max() {
        assert_eq!(
            ExponentialBackoff::delay_for_attempt(64, Duration::from_secs(5), Duration::from_secs(300)),
            Duration::from_secs(300)
        );
    }
}
