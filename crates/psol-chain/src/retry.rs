//! Bounded retry with exponential backoff for transient chain errors.

use std::thread;
use std::time::Duration;

use crate::error::ChainError;

/// Retry schedule for one submission attempt chain.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Per-attempt delay multiplier.
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2,
        }
    }
}

/// delay = `base_delay` × (`backoff_factor` ^ `attempt`), capped at
/// `max_delay`.
fn calculate_backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let delay = policy
        .base_delay
        .checked_mul(policy.backoff_factor.saturating_pow(attempt))
        .unwrap_or(policy.max_delay);
    delay.min(policy.max_delay)
}

/// Runs `operation`, retrying transient failures up to
/// `policy.max_retries` times with exponential backoff. Non-transient
/// errors return immediately.
pub fn retry_with_backoff<T, F>(policy: &RetryPolicy, mut operation: F) -> Result<T, ChainError>
where
    F: FnMut() -> Result<T, ChainError>,
{
    let mut attempt = 0u32;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt < policy.max_retries && error.is_transient() {
                    let delay = calculate_backoff_delay(policy, attempt);
                    tracing::warn!(attempt, ?delay, %error, "transient chain error, backing off");
                    thread::sleep(delay);
                    attempt = attempt.saturating_add(1);
                } else {
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests")]

    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_factor: 2,
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2,
        };
        for i in 0..4 {
            assert_eq!(
                calculate_backoff_delay(&policy, i),
                Duration::from_millis(100).saturating_mul(2u32.saturating_pow(i))
            );
        }
        assert_eq!(
            calculate_backoff_delay(&policy, 30),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn succeeds_on_first_try() {
        let mut calls = 0u32;
        let result = retry_with_backoff(&fast_policy(), || {
            calls += 1;
            Ok::<_, ChainError>(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0u32;
        let result: Result<(), _> = retry_with_backoff(&fast_policy(), || {
            calls += 1;
            Err(ChainError::Transient("node behind".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 4); // 1 initial + 3 retries
    }

    #[test]
    fn non_transient_is_not_retried() {
        let mut calls = 0u32;
        let result: Result<(), _> = retry_with_backoff(&fast_policy(), || {
            calls += 1;
            Err(ChainError::Rejected("stale root".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn succeeds_on_last_retry() {
        let mut calls = 0u32;
        let result = retry_with_backoff(&fast_policy(), || {
            calls += 1;
            if calls < 4 {
                Err(ChainError::Transient("timeout".into()))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 4);
    }

    #[test]
    fn already_advanced_is_not_transient() {
        assert!(!ChainError::AlreadyAdvanced.is_transient());
        assert!(ChainError::Transient("x".into()).is_transient());
    }
}
