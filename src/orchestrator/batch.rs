//! Batch combinators over the per-request pipeline.
//!
//! Each combinator submits every request through the normal pipeline
//! (none bypasses scheduling, rate limiting, retries, or deadlines) and
//! differs only in how the per-request outcomes are combined.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::{join_all, select_all};

use crate::error::GovernorResult;
use crate::events::{BatchKind, GovernorEvent};
use crate::observability::metrics as facade;
use crate::orchestrator::pipeline::{ExecuteOptions, Operation, Orchestrator};

/// One entry of a batch: an operation plus its per-request options.
pub struct BatchRequest<T> {
    pub operation: Operation<T>,
    pub options: ExecuteOptions,
}

impl<T> BatchRequest<T> {
    pub fn new(operation: Operation<T>) -> Self {
        Self {
            operation,
            options: ExecuteOptions::default(),
        }
    }

    pub fn with_options(operation: Operation<T>, options: ExecuteOptions) -> Self {
        Self { operation, options }
    }
}

impl<T: Send + 'static> Orchestrator<T> {
    /// All-succeed combinator: resolves with every value once all
    /// requests succeed, fails fast on the first failure.
    pub async fn execute_all(&self, requests: Vec<BatchRequest<T>>) -> GovernorResult<Vec<T>> {
        let count = requests.len();
        self.events.publish(GovernorEvent::BatchStart {
            count,
            kind: BatchKind::All,
        });
        facade::record_batch(BatchKind::All.as_str(), count);

        let settled = AtomicUsize::new(0);
        let futures: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let settled = &settled;
                async move {
                    let outcome = self.execute(request.operation, request.options).await;
                    if outcome.is_ok() {
                        settled.fetch_add(1, Ordering::SeqCst);
                    }
                    outcome
                }
            })
            .collect();

        let result = futures_util::future::try_join_all(futures).await;
        match &result {
            Ok(values) => self.events.publish(GovernorEvent::BatchComplete {
                successful: values.len(),
                failed: 0,
            }),
            Err(_) => self.events.publish(GovernorEvent::BatchComplete {
                successful: settled.load(Ordering::SeqCst),
                failed: 1,
            }),
        }
        result
    }

    /// Wait for every request regardless of outcome; returns each as a
    /// tagged success/failure. Never fails itself.
    pub async fn settle_all(&self, requests: Vec<BatchRequest<T>>) -> Vec<GovernorResult<T>> {
        let count = requests.len();
        self.events.publish(GovernorEvent::BatchStart {
            count,
            kind: BatchKind::SettleAll,
        });
        facade::record_batch(BatchKind::SettleAll.as_str(), count);

        let futures: Vec<_> = requests
            .into_iter()
            .map(|request| self.execute(request.operation, request.options))
            .collect();
        let outcomes = join_all(futures).await;

        let successful = outcomes.iter().filter(|o| o.is_ok()).count();
        self.events.publish(GovernorEvent::BatchComplete {
            successful,
            failed: outcomes.len() - successful,
        });
        outcomes
    }

    /// First request to settle wins, success or failure. The remaining
    /// requests are detached; their late settlements are no-ops.
    pub async fn first_to_finish(&self, requests: Vec<BatchRequest<T>>) -> GovernorResult<T> {
        let count = requests.len();
        self.events.publish(GovernorEvent::BatchStart {
            count,
            kind: BatchKind::FirstToFinish,
        });
        facade::record_batch(BatchKind::FirstToFinish.as_str(), count);

        if requests.is_empty() {
            self.events.publish(GovernorEvent::BatchComplete {
                successful: 0,
                failed: 0,
            });
            return Err(crate::error::GovernorError::Aborted);
        }

        let futures: Vec<_> = requests
            .into_iter()
            .map(|request| Box::pin(self.execute(request.operation, request.options)))
            .collect();
        let (outcome, _, _) = select_all(futures).await;

        self.events.publish(GovernorEvent::BatchComplete {
            successful: usize::from(outcome.is_ok()),
            failed: usize::from(outcome.is_err()),
        });
        outcome
    }

    /// First success wins; failures only count once every request has
    /// failed, in which case the last failure propagates.
    pub async fn first_success(&self, requests: Vec<BatchRequest<T>>) -> GovernorResult<T> {
        let count = requests.len();
        self.events.publish(GovernorEvent::BatchStart {
            count,
            kind: BatchKind::FirstSuccess,
        });
        facade::record_batch(BatchKind::FirstSuccess.as_str(), count);

        let mut remaining: Vec<_> = requests
            .into_iter()
            .map(|request| Box::pin(self.execute(request.operation, request.options)))
            .collect();

        let mut failed = 0usize;
        let mut last_error = None;
        while !remaining.is_empty() {
            let (outcome, _, rest) = select_all(remaining).await;
            match outcome {
                Ok(value) => {
                    self.events.publish(GovernorEvent::BatchComplete {
                        successful: 1,
                        failed,
                    });
                    return Ok(value);
                }
                Err(error) => {
                    failed += 1;
                    last_error = Some(error);
                    remaining = rest;
                }
            }
        }

        self.events.publish(GovernorEvent::BatchComplete {
            successful: 0,
            failed,
        });
        // An empty batch has no outcome to surface either way.
        Err(last_error.unwrap_or(crate::error::GovernorError::Aborted))
    }
}
