// crates/core/src/poller/policy.rs
//! Tick spacing and give-up ceilings for job polls.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;

/// Shortest spacing a poller will use between status requests.
pub const MIN_POLL_INTERVAL_MS: u64 = 1;

/// How often a job is polled and when polling gives up.
///
/// Delay before attempt `n` (0-based) is `interval * backoff_factor^n`,
/// capped at `max_interval`. A poll that has made `max_attempts` requests or
/// run for `max_duration` without a terminal status ends as timed out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub interval_ms: u64,
    pub backoff_factor: f64,
    pub max_interval_ms: u64,
    pub max_attempts: Option<u32>,
    pub max_duration_secs: Option<u64>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            backoff_factor: 1.5,
            max_interval_ms: 30_000,
            max_attempts: None,
            max_duration_secs: Some(30 * 60),
        }
    }
}

impl PollPolicy {
    /// Constant interval, no ceilings.
    pub fn fixed(interval: Duration) -> Self {
        let ms = interval.as_millis() as u64;
        Self {
            interval_ms: ms,
            backoff_factor: 1.0,
            max_interval_ms: ms,
            max_attempts: None,
            max_duration_secs: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration_secs = Some(duration.as_secs());
        self
    }

    /// Raise a zero interval to [`MIN_POLL_INTERVAL_MS`].
    pub fn clamped(mut self) -> Self {
        if self.interval_ms < MIN_POLL_INTERVAL_MS {
            warn!(interval_ms = self.interval_ms, "poll interval too short; clamping");
            self.interval_ms = MIN_POLL_INTERVAL_MS;
            self.max_interval_ms = self.max_interval_ms.max(MIN_POLL_INTERVAL_MS);
        }
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Delay to wait before the given attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.interval_ms as f64;
        let cap = self.max_interval_ms.max(self.interval_ms) as f64;
        let factor = if self.backoff_factor.is_finite() && self.backoff_factor > 1.0 {
            self.backoff_factor
        } else {
            1.0
        };
        let exp = attempt.min(i32::MAX as u32) as i32;
        let delay = (base * factor.powi(exp)).min(cap);
        Duration::from_millis(delay as u64)
    }

    /// True once either ceiling has been reached.
    pub fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return true;
        }
        self.max_duration_secs
            .is_some_and(|max| elapsed >= Duration::from_secs(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_never_backs_off() {
        let policy = PollPolicy::fixed(Duration::from_millis(3_000));
        assert_eq!(policy.delay_for(0), Duration::from_secs(3));
        assert_eq!(policy.delay_for(50), Duration::from_secs(3));
        assert!(!policy.exhausted(u32::MAX, Duration::from_secs(86_400)));
    }

    #[test]
    fn test_default_backoff_is_capped() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(3_000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(4_500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(6_750));
        assert_eq!(policy.delay_for(20), Duration::from_millis(30_000));
    }

    #[test]
    fn test_factor_below_one_is_ignored() {
        let policy = PollPolicy {
            backoff_factor: 0.5,
            ..PollPolicy::default()
        };
        assert_eq!(policy.delay_for(4), policy.interval());
    }

    #[test]
    fn test_ceilings() {
        let policy = PollPolicy::fixed(Duration::from_secs(1))
            .with_max_attempts(3)
            .with_max_duration(Duration::from_secs(60));
        assert!(!policy.exhausted(2, Duration::from_secs(2)));
        assert!(policy.exhausted(3, Duration::from_secs(3)));
        assert!(policy.exhausted(1, Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let policy = PollPolicy::fixed(Duration::ZERO).clamped();
        assert_eq!(policy.interval_ms, MIN_POLL_INTERVAL_MS);
        assert_eq!(policy.delay_for(0), Duration::from_millis(1));
        assert_eq!(policy.delay_for(9), Duration::from_millis(1));

        let policy = PollPolicy::default().clamped();
        assert_eq!(policy, PollPolicy::default());
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let policy: PollPolicy = toml::from_str("interval_ms = 500\nmax_attempts = 10").unwrap();
        assert_eq!(policy.interval(), Duration::from_millis(500));
        assert_eq!(policy.max_attempts, Some(10));
        assert_eq!(policy.backoff_factor, 1.5);
    }
}
