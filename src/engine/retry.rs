use rand::Rng;
use std::time::Duration;

/// Backoff parameters (spec §4.5, §6 defaults: initial 1s, multiplier
/// 2x, max 60s, 5 attempts).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
        }
    }
}

/// Outcome of consulting the policy after a failed attempt (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    Exhausted,
}

impl RetryPolicy {
    /// `delay_n = min(max_delay, initial_delay * multiplier^(n-1)) + jitter()`
    /// where jitter is additive uniform in `[0, initial_delay)` (spec
    /// §4.5). `attempt` is 1-indexed (the attempt that just failed).
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::Exhausted;
        }
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32 - 1);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.0..self.initial_delay.as_secs_f64());
        RetryDecision::RetryAfter(Duration::from_secs_f64(capped + jitter))
    }
}

/// A job that exhausted its retry budget and was moved to the
/// dead-letter queue (spec §4.5 "after max attempts, stop retrying and
/// surface the failure").
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub job_id: uuid::Uuid,
    pub attempts: u32,
    pub last_error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_attempt_and_is_capped() {
        let policy = RetryPolicy::default();
        let d1 = match policy.decide(1) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        let d2 = match policy.decide(2) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert!(d1.as_secs_f64() >= 1.0 && d1.as_secs_f64() < 2.0);
        assert!(d2.as_secs_f64() >= 2.0 && d2.as_secs_f64() < 3.0);
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.decide(5), RetryDecision::Exhausted);
        assert_eq!(policy.decide(6), RetryDecision::Exhausted);
    }

    #[test]
    fn delay_never_exceeds_max_delay_plus_jitter_band() {
        let policy = RetryPolicy { max_attempts: 20, ..RetryPolicy::default() };
        let d = match policy.decide(19) {
            RetryDecision::RetryAfter(d) => d,
            _ => panic!("expected retry"),
        };
        assert!(d.as_secs_f64() <= policy.max_delay.as_secs_f64() + policy.initial_delay.as_secs_f64());
    }
}
