//! Exponential backoff policies.
//!
//! Retry behavior is expressed as policy values rather than ad-hoc sleeps:
//! one policy for serializable-transaction retries, one for broker
//! publishes, one for expired-hold processing.

use std::time::Duration;

/// An exponential backoff schedule: `base * 2^attempt`, capped at `cap`,
/// with optional symmetric jitter.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the second attempt.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub cap: Duration,
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Jitter fraction in `[0.0, 1.0)`; 0.25 means ±25%.
    pub jitter: f64,
}

/// Retry schedule for serializable transaction conflicts.
pub const SERIALIZATION_RETRY: BackoffPolicy = BackoffPolicy {
    base: Duration::from_millis(50),
    cap: Duration::from_secs(1),
    max_attempts: 5,
    jitter: 0.25,
};

/// Retry schedule for broker publishes inside one publisher tick.
pub const BROKER_PUBLISH_RETRY: BackoffPolicy = BackoffPolicy {
    base: Duration::from_secs(1),
    cap: Duration::from_secs(8),
    max_attempts: 3,
    jitter: 0.0,
};

/// Retry schedule for releasing one expired hold.
pub const EXPIRY_RETRY: BackoffPolicy = BackoffPolicy {
    base: Duration::from_secs(1),
    cap: Duration::from_secs(8),
    max_attempts: 3,
    jitter: 0.0,
};

impl BackoffPolicy {
    /// Delay to sleep after the given zero-based attempt fails.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.min(31);
        let raw = self.base.saturating_mul(1u32 << exp);
        raw.min(self.cap)
    }

    /// [`delay_for`](Self::delay_for) with jitter applied.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        if self.jitter <= 0.0 {
            return delay;
        }
        let spread = delay.as_secs_f64() * self.jitter;
        let offset = rand::random::<f64>() * 2.0 * spread - spread;
        Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_cap() {
        let policy = BackoffPolicy {
            base: Duration::from_millis(50),
            cap: Duration::from_secs(1),
            max_attempts: 5,
            jitter: 0.0,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_secs(1));
        assert_eq!(policy.delay_for(20), Duration::from_secs(1));
    }

    #[test]
    fn expiry_schedule_is_one_two_four() {
        assert_eq!(EXPIRY_RETRY.delay_for(0), Duration::from_secs(1));
        assert_eq!(EXPIRY_RETRY.delay_for(1), Duration::from_secs(2));
        assert_eq!(EXPIRY_RETRY.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = SERIALIZATION_RETRY;
        let nominal = policy.delay_for(2).as_secs_f64();
        for _ in 0..1000 {
            let jittered = policy.jittered_delay_for(2).as_secs_f64();
            assert!(jittered >= nominal * 0.749);
            assert!(jittered <= nominal * 1.251);
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        assert_eq!(
            BROKER_PUBLISH_RETRY.jittered_delay_for(1),
            Duration::from_secs(2)
        );
    }
}
