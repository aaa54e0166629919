use std::time::Duration;

use rand::Rng;

/// Bounded retry with exponential backoff for rate-limited upstreams.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }

    #[must_use]
    pub fn attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Statuses worth retrying: rate limiting and transient server errors.
#[must_use]
pub fn retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Randomized pause between sub-steps of a strategy, so repeated requests
/// do not land on the upstream in lockstep.
#[must_use]
pub fn request_jitter() -> Duration {
    let millis = rand::thread_rng().gen_range(1_000..=2_000);
    Duration::from_millis(millis)
}

/// Shorter jitter appended to backoff delays.
#[must_use]
pub fn backoff_jitter() -> Duration {
    let millis = rand::thread_rng().gen_range(0..=500);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
    }

    #[test]
    fn retryable_statuses() {
        assert!(retryable_status(429));
        assert!(retryable_status(500));
        assert!(retryable_status(503));
        assert!(!retryable_status(200));
        assert!(!retryable_status(404));
    }

    #[test]
    fn attempts_are_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.attempts_left(1));
        assert!(policy.attempts_left(2));
        assert!(!policy.attempts_left(3));
    }

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..32 {
            let pause = request_jitter();
            assert!(pause >= Duration::from_millis(1_000));
            assert!(pause <= Duration::from_millis(2_000));
        }
    }
}
