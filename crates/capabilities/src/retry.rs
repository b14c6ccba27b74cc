//! Exponential-backoff retry for capability calls.
//!
//! Every call to an external capability goes through
//! [`RetryPolicy::run`]. Only errors for which
//! [`CapabilityError::is_transient`] holds are retried; anything else is
//! returned on the first failure.

use std::future::Future;
use std::time::Duration;

use takeone_core::error::CoreError;

use crate::error::CapabilityError;

/// Default number of attempts per call, first attempt included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first attempt included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and policy.
///
/// The result is clamped to [`RetryPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_attempts == 0 {
            return Err(CoreError::Validation(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CoreError::Validation(format!(
                "multiplier must be at least 1.0, got {}",
                self.multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(CoreError::Validation(
                "initial_delay must not exceed max_delay".to_string(),
            ));
        }
        Ok(())
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `operation` names the call in log output.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, CapabilityError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CapabilityError>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(operation, attempt, "Capability call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient capability failure, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, self);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;

    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    fn unavailable() -> CapabilityError {
        CapabilityError::Api {
            status: 503,
            body: "busy".into(),
        }
    }

    // -- next_delay ----------------------------------------------------------

    #[test]
    fn next_delay_doubles() {
        let policy = RetryPolicy::default();
        let d = next_delay(Duration::from_millis(250), &policy);
        assert_eq!(d, Duration::from_millis(500));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        let d = next_delay(Duration::from_millis(800), &policy);
        assert_eq!(d, Duration::from_secs(1));
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        let expected = [250, 500, 1000, 2000, 4000, 5000, 5000];

        for &expected_ms in &expected {
            assert_eq!(delay.as_millis() as u64, expected_ms);
            delay = next_delay(delay, &policy);
        }
    }

    // -- validate ------------------------------------------------------------

    #[test]
    fn zero_attempts_is_invalid() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::default().with_max_attempts(0).validate().is_err());
    }

    #[test]
    fn shrinking_multiplier_is_invalid() {
        let policy = RetryPolicy {
            multiplier: 0.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    // -- run -----------------------------------------------------------------

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = fast_policy(3)
            .run("embed", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = fast_policy(2)
            .run("embed", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;
        assert_matches!(result, Err(CapabilityError::Api { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = fast_policy(5)
            .run("parse", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CapabilityError::Malformed("not json".into()))
            })
            .await;
        assert_matches!(result, Err(CapabilityError::Malformed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
