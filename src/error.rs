//! Error taxonomy for governed executions.
//!
//! Every request settled by the pipeline either resolves with the
//! operation's value or rejects with exactly one [`GovernorError`] kind.
//! The scheduler and the rate window never convert errors; they forward
//! whatever the inner layer produced, or synthesize `Aborted` /
//! `QueueCleared` for entries they discard themselves.

use thiserror::Error;

/// Errors surfaced by the resilience pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernorError {
    /// An attempt exceeded its per-attempt deadline.
    #[error("attempt timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The request was cancelled explicitly, before or during an attempt.
    #[error("operation aborted")]
    Aborted,

    /// The rate window was full and the caller opted out of waiting.
    #[error("rate limit exceeded: {in_window} admissions in the current window")]
    RateLimitExceeded { in_window: usize },

    /// The governed operation reported a failure with an upstream status.
    #[error("upstream failure with status {status}")]
    Upstream { status: u16 },

    /// The request was discarded from the rate window's wait list by a
    /// bulk cancel before it was ever admitted.
    #[error("discarded from the admission queue")]
    QueueCleared,
}

impl GovernorError {
    /// The status code used for retryability classification.
    ///
    /// Timeouts classify as 408 (request timeout); upstream failures carry
    /// their own status. Cancellation-shaped errors have no status and are
    /// never retryable.
    pub fn effective_status(&self) -> Option<u16> {
        match self {
            GovernorError::Timeout { .. } => Some(408),
            GovernorError::Upstream { status } => Some(*status),
            GovernorError::Aborted
            | GovernorError::RateLimitExceeded { .. }
            | GovernorError::QueueCleared => None,
        }
    }

    /// True if this error came from explicit cancellation rather than the
    /// operation itself.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, GovernorError::Aborted | GovernorError::QueueCleared)
    }
}

/// Result type for governed operations.
pub type GovernorResult<T> = Result<T, GovernorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GovernorError::Timeout { timeout_ms: 50 };
        assert_eq!(err.to_string(), "attempt timed out after 50 ms");

        let err = GovernorError::Upstream { status: 503 };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_effective_status() {
        assert_eq!(
            GovernorError::Timeout { timeout_ms: 10 }.effective_status(),
            Some(408)
        );
        assert_eq!(
            GovernorError::Upstream { status: 429 }.effective_status(),
            Some(429)
        );
        assert_eq!(GovernorError::Aborted.effective_status(), None);
        assert_eq!(GovernorError::QueueCleared.effective_status(), None);
    }
}
