use std::time::Duration;

/// Explicit retry policy, replacing decorator-based retry from the
/// source system: bounded exponential backoff with jitter, passed into
/// a `MetadataProvider` at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_backoff.saturating_mul(1u32 << attempt.min(16));
        exp.saturating_add(self.jitter_for_attempt(attempt))
    }

    fn jitter_for_attempt(&self, attempt: u32) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let millis = self.jitter.as_millis() as u64;
        let sample = (u64::from(attempt).wrapping_mul(2654435761) % millis.max(1)) as u64;
        Duration::from_millis(sample)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            jitter: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_with_attempt() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff_for_attempt(0) < policy.backoff_for_attempt(3));
    }

    #[test]
    fn max_attempts_bounds_retry_loop() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.max_attempts, 1);
    }
}
