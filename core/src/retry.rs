//! Exponential backoff for transient failures.

use std::fmt::Display;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How many times to try an operation and how long to wait in between.
///
/// With the defaults an operation runs at most three times, waiting 500 ms
/// after the first failure and 1 s after the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delays longer than `u64::MAX` milliseconds saturate.
    pub const fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        let millis = initial_delay.as_millis();
        Self {
            max_attempts,
            initial_delay_ms: if millis > u64::MAX as u128 {
                u64::MAX
            } else {
                millis as u64
            },
            multiplier: 2,
        }
    }

    /// Try exactly once.
    pub const fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is the 1-based
    /// number of the attempt that just failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.initial_delay_ms.saturating_mul(factor))
    }

    /// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
    /// or the attempts are used up. `op` receives the 1-based attempt number.
    pub fn run<T, E, F, P>(&self, mut op: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && is_retryable(&err) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient failure, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Failure {
        Transient,
        Fatal,
    }

    impl Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn default_schedule_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
    }

    #[test]
    fn huge_initial_delay_saturates() {
        let policy = RetryPolicy::new(3, Duration::MAX);
        assert_eq!(policy.initial_delay_ms, u64::MAX);
        assert_eq!(policy.delay_after(2), Duration::from_millis(u64::MAX));

        let policy = RetryPolicy::new(3, Duration::from_millis(1500));
        assert_eq!(policy.initial_delay_ms, 1500);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), Failure> = instant(3).run(
            |_| {
                calls += 1;
                Err(Failure::Transient)
            },
            |e| *e == Failure::Transient,
        );
        assert_eq!(result, Err(Failure::Transient));
        assert_eq!(calls, 3);
    }

    #[test]
    fn stops_on_first_non_retryable_error() {
        let mut calls = 0;
        let result: Result<(), Failure> = instant(3).run(
            |_| {
                calls += 1;
                Err(Failure::Fatal)
            },
            |e| *e == Failure::Transient,
        );
        assert_eq!(result, Err(Failure::Fatal));
        assert_eq!(calls, 1);
    }

    #[test]
    fn recovers_when_a_later_attempt_succeeds() {
        let result = instant(3).run(
            |attempt| if attempt < 3 { Err(Failure::Transient) } else { Ok(attempt) },
            |e| *e == Failure::Transient,
        );
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        let _: Result<(), Failure> = instant(0).run(
            |_| {
                calls += 1;
                Err(Failure::Transient)
            },
            |_| true,
        );
        assert_eq!(calls, 1);
    }

    #[test]
    fn deserializes_partial_policy() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts":5}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay_ms, 500);
    }
}
