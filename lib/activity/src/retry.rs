//! Bounded retry with exponential backoff around activity calls.
//!
//! The invoker owns the retry loop so orchestration logic only ever sees an
//! activity's final outcome: success, or the last error once attempts are
//! exhausted. Non-retryable errors short-circuit immediately.

use crate::contract::ActivityContext;
use crate::error::ActivityError;
use crate::heartbeat;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for a single logical activity call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub initial_interval: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
    /// Ceiling on the delay between attempts.
    pub max_interval: Duration,
    /// Total number of attempts (not retries); must be at least 1.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(60),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Returns the backoff delay after the given failed attempt (1-based).
    #[must_use]
    pub fn interval_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = self.initial_interval.mul_f64(factor);
        delay.min(self.max_interval)
    }
}

/// Executes activity calls under a retry policy and per-attempt liveness
/// window.
#[derive(Debug, Clone)]
pub struct ActivityInvoker {
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl ActivityInvoker {
    /// Creates an invoker with the given policy and a default five-minute
    /// per-attempt liveness window.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt_timeout: Duration::from_secs(300),
        }
    }

    /// Sets the per-attempt liveness window.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invokes an activity, retrying transient failures with exponential
    /// backoff up to the policy's attempt bound.
    ///
    /// The closure is called once per attempt with a fresh
    /// [`ActivityContext`] carrying the attempt number and heartbeat handle.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error encountered, or the last
    /// transient/timeout error once `max_attempts` attempts have been made.
    pub async fn invoke<T, F, Fut>(
        &self,
        operation: &str,
        mut call: F,
    ) -> Result<T, ActivityError>
    where
        F: FnMut(ActivityContext) -> Fut,
        Fut: Future<Output = Result<T, ActivityError>>,
    {
        let mut last_error = ActivityError::non_retryable(format!(
            "{operation}: retry policy allows no attempts"
        ));

        for attempt in 1..=self.policy.max_attempts {
            let (ctx, handle) = ActivityContext::new(attempt);
            match heartbeat::run_with_liveness(self.attempt_timeout, handle, call(ctx)).await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %error,
                        "activity attempt failed"
                    );
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.interval_after(attempt)).await;
                    }
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }
}

impl Default for ActivityInvoker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
