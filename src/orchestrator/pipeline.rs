//! Per-request pipeline composition.
//!
//! # Responsibilities
//! - Nest the four policies around each caller-supplied operation:
//!   scheduler admission (outermost) → rate admission → retry loop →
//!   per-attempt deadline guard → operation
//! - Publish lifecycle events and record settlement metrics exactly once
//!   per request
//! - Route aborts to the right layer (queued job vs in-flight attempt)
//!
//! # Design Decisions
//! - Rate admission happens before any retry attempt is spent; one
//!   admission covers the whole retry sequence
//! - Deadlines are per attempt: every retry gets a fresh token and budget
//! - All registries (jobs, tickets, guards) are owned by this instance;
//!   nothing is process-wide

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::GovernorConfig;
use crate::error::GovernorResult;
use crate::events::{EventBus, GovernorEvent};
use crate::observability::metrics as facade;
use crate::orchestrator::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::rate_limit::{RateWindow, RateWindowStatus};
use crate::resilience::{DeadlineGuard, RetryPolicy};
use crate::scheduler::{JobHandle, PriorityScheduler, SchedulerStatus};

/// The future one governed operation attempt produces.
pub type OperationFuture<T> = Pin<Box<dyn Future<Output = GovernorResult<T>> + Send>>;

/// A caller-supplied asynchronous operation.
///
/// Invoked once per attempt with a fresh cancellation token. The token is
/// advisory: the pipeline stops waiting on an attempt that outlives its
/// deadline, but only the operation itself can abandon its own work.
pub type Operation<T> = Arc<dyn Fn(CancellationToken) -> OperationFuture<T> + Send + Sync>;

/// Wrap an async closure as an [`Operation`].
pub fn operation<T, F, Fut>(f: F) -> Operation<T>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GovernorResult<T>> + Send + 'static,
{
    Arc::new(move |token| Box::pin(f(token)))
}

/// Per-request knobs over the configured defaults.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Higher runs first; equal priorities dispatch in arrival order.
    pub priority: i32,
    /// Per-attempt deadline override.
    pub timeout: Option<Duration>,
    /// Opt out of retries for this request.
    pub retry: bool,
    /// When false, a full rate window fails the request with
    /// `RateLimitExceeded` instead of waiting for capacity.
    pub wait_for_capacity: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            timeout: None,
            retry: true,
            wait_for_capacity: true,
        }
    }
}

impl ExecuteOptions {
    /// Options with the given priority, defaults otherwise.
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }
}

/// Handle to an in-flight request.
///
/// Resolves with the request's terminal outcome; exposes the request id
/// for targeted aborts.
pub struct RequestHandle<T> {
    id: Uuid,
    job: JobHandle<T>,
}

impl<T> RequestHandle<T> {
    /// The request's identity, usable with [`Orchestrator::abort`].
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T> Future for RequestHandle<T> {
    type Output = GovernorResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.job).poll(cx)
    }
}

/// Combined read-only view of the whole pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct GovernorStatus {
    pub metrics: MetricsSnapshot,
    pub scheduler: SchedulerStatus,
    pub rate_window: RateWindowStatus,
}

/// Composes the four policies around caller-supplied operations.
pub struct Orchestrator<T> {
    scheduler: PriorityScheduler<T>,
    window: RateWindow,
    retry_policy: RetryPolicy,
    deadlines: Arc<DeadlineGuard>,
    recorder: Arc<MetricsRecorder>,
    pub(crate) events: EventBus,
    retries_enabled: bool,
    default_timeout: Duration,
}

impl<T: Send + 'static> Orchestrator<T> {
    /// Build a governor from a validated configuration.
    pub fn new(config: GovernorConfig) -> Self {
        tracing::info!(
            max_concurrent = config.scheduler.max_concurrent,
            max_requests = config.rate_limit.max_requests,
            window_ms = config.rate_limit.window_ms,
            max_retries = config.retries.max_retries,
            timeout_ms = config.timeouts.request_ms,
            "Governor starting"
        );
        Self {
            scheduler: PriorityScheduler::new(config.scheduler.max_concurrent),
            window: RateWindow::from_config(&config.rate_limit),
            retry_policy: RetryPolicy::from_config(&config.retries),
            deadlines: Arc::new(DeadlineGuard::new()),
            recorder: Arc::new(MetricsRecorder::new()),
            events: EventBus::default(),
            retries_enabled: config.retries.enabled,
            default_timeout: Duration::from_millis(config.timeouts.request_ms),
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<GovernorEvent> {
        self.events.subscribe()
    }

    /// Run one operation through the full pipeline and await its outcome.
    pub async fn execute(
        &self,
        operation: Operation<T>,
        options: ExecuteOptions,
    ) -> GovernorResult<T> {
        self.submit(operation, options).await
    }

    /// Enter one operation into the pipeline, returning a handle that can
    /// be awaited or aborted by id.
    pub fn submit(&self, operation: Operation<T>, options: ExecuteOptions) -> RequestHandle<T> {
        let id = Uuid::new_v4();
        let started = Instant::now();
        self.events.publish(GovernorEvent::RequestStart { id });
        tracing::debug!(request_id = %id, priority = options.priority, "Request accepted");

        let window = self.window.clone();
        let retry_policy = self.retry_policy.clone();
        let deadlines = self.deadlines.clone();
        let recorder = self.recorder.clone();
        let events = self.events.clone();
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let retry_enabled = self.retries_enabled && options.retry;
        let wait_for_capacity = options.wait_for_capacity;
        let priority = options.priority;

        let job = self.scheduler.enqueue_with_id(id, priority, move || async move {
            let result = Self::run_governed(
                id,
                operation,
                window,
                retry_policy,
                deadlines,
                events.clone(),
                timeout,
                retry_enabled,
                wait_for_capacity,
                priority,
            )
            .await;

            Self::settle(&recorder, &events, id, started, &result);
            result
        });

        RequestHandle { id, job }
    }

    /// The pipeline stages inside the scheduler slot: rate admission, then
    /// the retry loop, each attempt under its own deadline.
    #[allow(clippy::too_many_arguments)]
    async fn run_governed(
        id: Uuid,
        operation: Operation<T>,
        window: RateWindow,
        retry_policy: RetryPolicy,
        deadlines: Arc<DeadlineGuard>,
        events: EventBus,
        timeout: Duration,
        retry_enabled: bool,
        wait_for_capacity: bool,
        priority: i32,
    ) -> GovernorResult<T> {
        let _ticket = if wait_for_capacity {
            window.admit(priority).await?
        } else {
            match window.try_admit(priority) {
                Ok(guard) => guard,
                Err(error) => {
                    facade::record_rate_limited();
                    return Err(error);
                }
            }
        };

        let attempt_fn = |attempt: u32| {
            let operation = operation.clone();
            let deadlines = deadlines.clone();
            let events = events.clone();
            async move {
                events.publish(GovernorEvent::RequestAttempt { id, attempt });
                deadlines
                    .guard(id, timeout, move |token| operation(token))
                    .await
            }
        };

        if retry_enabled {
            retry_policy.run(attempt_fn).await
        } else {
            attempt_fn(0).await
        }
    }

    /// Settlement bookkeeping: exactly once per request that ran.
    fn settle(
        recorder: &MetricsRecorder,
        events: &EventBus,
        id: Uuid,
        started: Instant,
        result: &GovernorResult<T>,
    ) {
        let latency = started.elapsed();
        match result {
            Ok(_) => {
                recorder.record_outcome(true, Some(latency));
                facade::record_request_outcome("success", latency);
                events.publish(GovernorEvent::RequestSuccess { id, latency });
                tracing::debug!(
                    request_id = %id,
                    latency_ms = latency.as_millis() as u64,
                    "Request succeeded"
                );
            }
            Err(error) => {
                recorder.record_outcome(false, Some(latency));
                facade::record_request_outcome("failure", latency);
                events.publish(GovernorEvent::RequestError {
                    id,
                    message: error.to_string(),
                });
                tracing::warn!(request_id = %id, error = %error, "Request failed");
            }
        }
        events.publish(GovernorEvent::MetricsUpdate {
            snapshot: recorder.snapshot(),
        });
    }

    /// Abort a request: a queued job settles `Aborted` immediately; an
    /// in-flight attempt has its cancellation token triggered. Returns
    /// false if the id is unknown (or already settled).
    pub fn abort(&self, id: Uuid) -> bool {
        if self.scheduler.cancel(id) {
            self.recorder.record_outcome(false, None);
            self.events.publish(GovernorEvent::RequestError {
                id,
                message: crate::error::GovernorError::Aborted.to_string(),
            });
            return true;
        }
        self.deadlines.abort(id)
    }

    /// Cancel every queued (not yet running) request; returns the count.
    pub fn cancel_all_queued(&self) -> usize {
        let cancelled = self.scheduler.cancel_all();
        for _ in 0..cancelled {
            self.recorder.record_outcome(false, None);
        }
        cancelled
    }

    /// Abort every in-flight attempt; returns the count.
    pub fn abort_all_inflight(&self) -> usize {
        self.deadlines.abort_all()
    }

    /// Reject every request parked at the rate window; returns the count.
    pub fn clear_admission_queue(&self) -> usize {
        self.window.clear_queue()
    }

    /// Combined snapshot of metrics, scheduler, and rate window.
    pub fn status(&self) -> GovernorStatus {
        GovernorStatus {
            metrics: self.recorder.snapshot(),
            scheduler: self.scheduler.status(),
            rate_window: self.window.status(),
        }
    }

    /// Number of attempts currently under a deadline. Zero when idle.
    pub fn active_deadline_guards(&self) -> usize {
        self.deadlines.active_guards()
    }

    /// Zero the aggregate counters and the scheduler's per-status totals.
    pub fn reset_metrics(&self) {
        self.recorder.reset();
        self.scheduler.reset_counters();
    }
}
