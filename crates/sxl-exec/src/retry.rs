//! Bounded exponential backoff with jitter for transient, idempotent failures (§5).

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 0, base_delay: Duration::from_millis(100), max_delay: Duration::from_secs(10) }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, ..Default::default() }
    }

    /// Delay before the attempt numbered `attempt` (1-based: the delay before the
    /// *second* try is `backoff_delay(1)`), doubling each time and capped at
    /// `max_delay`, with up to 25% jitter added to avoid synchronized retries.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let doubled = self.base_delay.saturating_mul(1u32 << exponent);
        let capped = doubled.min(self.max_delay);
        let jitter_fraction = rand::thread_rng().gen_range(0.0..0.25);
        capped.mul_f64(1.0 + jitter_fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_never_exceeds_max_delay() {
        let policy = RetryPolicy { max_retries: 5, base_delay: Duration::from_millis(100), max_delay: Duration::from_millis(500) };
        assert!(policy.backoff_delay(1) >= Duration::from_millis(100));
        assert!(policy.backoff_delay(10) <= Duration::from_millis(500) * 2);
    }

    #[test]
    fn zero_retries_policy_has_no_bearing_on_a_single_attempt() {
        let policy = RetryPolicy::new(0);
        assert_eq!(policy.max_retries, 0);
    }
}
