//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a failed attempt is retryable (status-set membership)
//! - Execute retries with exponential backoff + jitter
//! - Enforce the attempt budget (max_retries + 1 total attempts)
//!
//! # Design Decisions
//! - Cancellation is never retried; the abort wins on first occurrence
//! - Timeouts classify as status 408, so the default set retries them
//! - Intermediate failures are logged, never surfaced to the caller

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{GovernorError, GovernorResult};
use crate::resilience::backoff::calculate_backoff;

/// Retry policy: attempt budget, backoff tuning, and the retryable set.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
    retryable_statuses: Vec<u16>,
}

impl RetryPolicy {
    /// Build a policy from the retry section of the config.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            retryable_statuses: config.retryable_statuses.clone(),
        }
    }

    /// Maximum number of retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// True if a failed attempt with this error may be retried.
    ///
    /// An error is retryable iff it was not caused by explicit cancellation
    /// and its effective status is in the configured retryable set.
    pub fn is_retryable(&self, error: &GovernorError) -> bool {
        if error.is_cancellation() {
            return false;
        }
        match error.effective_status() {
            Some(status) => self.retryable_statuses.contains(&status),
            None => false,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.initial_delay,
            self.backoff_multiplier,
            self.max_delay,
        )
    }

    /// Run `attempt_fn` until it succeeds, exhausts the budget, or fails
    /// with a non-retryable error.
    ///
    /// `attempt_fn` receives the 0-based attempt index. At most
    /// `max_retries + 1` attempts are made; the terminal error propagates
    /// unchanged.
    pub async fn run<T, F, Fut>(&self, mut attempt_fn: F) -> GovernorResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = GovernorResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match attempt_fn(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= self.max_retries || !self.is_retryable(&error) {
                        return Err(error);
                    }

                    let delay = self.backoff_delay(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying after backoff"
                    );
                    crate::observability::metrics::record_retry();
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            max_retries,
            initial_delay_ms: 10,
            max_delay_ms: 100,
            ..RetryConfig::default()
        })
    }

    #[test]
    fn test_retryable_classification() {
        let policy = policy(3);
        assert!(policy.is_retryable(&GovernorError::Upstream { status: 503 }));
        assert!(policy.is_retryable(&GovernorError::Timeout { timeout_ms: 50 }));
        assert!(!policy.is_retryable(&GovernorError::Upstream { status: 404 }));
        assert!(!policy.is_retryable(&GovernorError::Aborted));
        assert!(!policy.is_retryable(&GovernorError::QueueCleared));
    }

    #[tokio::test]
    async fn test_attempt_budget_exhausted() {
        let policy = policy(2);
        let calls = AtomicU32::new(0);

        let result: GovernorResult<()> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GovernorError::Upstream { status: 500 }) }
            })
            .await;

        assert_eq!(result, Err(GovernorError::Upstream { status: 500 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "max_retries + 1 attempts");
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let policy = policy(5);
        let calls = AtomicU32::new(0);

        let result: GovernorResult<()> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GovernorError::Aborted) }
            })
            .await;

        assert_eq!(result, Err(GovernorError::Aborted));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let policy = policy(3);
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(GovernorError::Upstream { status: 503 })
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
