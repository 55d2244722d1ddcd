//! Per-attempt deadline enforcement.
//!
//! # Responsibilities
//! - Race each attempt against its deadline timer
//! - Propagate cancellation into the attempt via an explicit token
//! - Support manual aborts of in-flight attempts, individually or in bulk
//!
//! # Design Decisions
//! - One fresh token and one timer per guarded attempt
//! - Every exit path deregisters the guard; no timer outlives its attempt
//! - Cancellation is advisory: an operation that ignores its token keeps
//!   running detached, and its late settlement is discarded

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{GovernorError, GovernorResult};

/// Guards in-flight attempts with a deadline and a cancellation token.
///
/// Owned by one orchestrator instance; keyed by request id so callers can
/// abort a specific in-flight attempt.
#[derive(Debug, Default)]
pub struct DeadlineGuard {
    active: DashMap<Uuid, CancellationToken>,
}

/// Removes a guard from the active set when dropped.
struct Registration<'a> {
    active: &'a DashMap<Uuid, CancellationToken>,
    id: Uuid,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.id);
    }
}

impl DeadlineGuard {
    pub fn new() -> Self {
        Self {
            active: DashMap::new(),
        }
    }

    /// Run one attempt under a deadline.
    ///
    /// The attempt receives a fresh cancellation token. If the deadline
    /// fires first, the token is cancelled (so the operation can abandon
    /// its own work), the pending attempt is discarded, and
    /// [`GovernorError::Timeout`] is returned. If the token is cancelled
    /// externally (via [`abort`](Self::abort) or
    /// [`abort_all`](Self::abort_all)), [`GovernorError::Aborted`] is
    /// returned instead.
    pub async fn guard<T, F, Fut>(
        &self,
        id: Uuid,
        timeout: Duration,
        attempt_fn: F,
    ) -> GovernorResult<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = GovernorResult<T>>,
    {
        let token = CancellationToken::new();
        self.active.insert(id, token.clone());
        // Deregisters on every exit path, including the caller dropping
        // this future mid-attempt.
        let _registration = Registration {
            active: &self.active,
            id,
        };

        let fut = attempt_fn(token.clone());
        tokio::pin!(fut);

        tokio::select! {
            res = &mut fut => res,
            _ = tokio::time::sleep(timeout) => {
                token.cancel();
                tracing::warn!(
                    request_id = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Attempt deadline expired"
                );
                Err(GovernorError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            _ = token.cancelled() => {
                tracing::debug!(request_id = %id, "Attempt aborted");
                Err(GovernorError::Aborted)
            }
        }
    }

    /// Abort one active guard by id.
    ///
    /// Clears its timer, triggers its cancellation signal, and removes it
    /// from the active set. Returns false if no guard with this id is
    /// active.
    pub fn abort(&self, id: Uuid) -> bool {
        match self.active.remove(&id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Abort every active guard. Returns the number aborted.
    pub fn abort_all(&self) -> usize {
        let ids: Vec<Uuid> = self.active.iter().map(|entry| *entry.key()).collect();
        let mut aborted = 0;
        for id in ids {
            if self.abort(id) {
                aborted += 1;
            }
        }
        aborted
    }

    /// Number of attempts currently guarded. Zero whenever no attempt is
    /// in flight; used by tests to assert nothing leaked.
    pub fn active_guards(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attempt_outcome_forwarded() {
        let guard = DeadlineGuard::new();
        let result = guard
            .guard(Uuid::new_v4(), Duration::from_secs(1), |_token| async {
                Ok(42)
            })
            .await;
        assert_eq!(result, Ok(42));
        assert_eq!(guard.active_guards(), 0);
    }

    #[tokio::test]
    async fn test_deadline_fires() {
        let guard = DeadlineGuard::new();
        let result: GovernorResult<()> = guard
            .guard(Uuid::new_v4(), Duration::from_millis(50), |_token| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(GovernorError::Timeout { timeout_ms: 50 }));
        assert_eq!(guard.active_guards(), 0);
    }

    #[tokio::test]
    async fn test_manual_abort() {
        let guard = std::sync::Arc::new(DeadlineGuard::new());
        let id = Uuid::new_v4();

        let g = guard.clone();
        let handle = tokio::spawn(async move {
            g.guard(id, Duration::from_secs(30), |_token| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(guard.active_guards(), 1);
        assert!(guard.abort(id));

        let result: GovernorResult<()> = handle.await.unwrap();
        assert_eq!(result, Err(GovernorError::Aborted));
        assert_eq!(guard.active_guards(), 0);
        assert!(!guard.abort(id), "second abort finds nothing");
    }
}
