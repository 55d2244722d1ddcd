//! Bounded-concurrency priority dispatch.
//!
//! # Responsibilities
//! - Accept jobs with a priority and hand back a settle-once handle
//! - Keep running jobs at or below the configured cap
//! - Dispatch (highest priority, earliest arrival) first, re-evaluated at
//!   every dispatch decision
//! - Cancel queued (never running) jobs on request
//!
//! # Design Decisions
//! - Settlement re-enters dispatch from the job's own spawned task, so the
//!   queue drains without external polling and without growing a stack of
//!   nested completion handlers
//! - Cancelled entries stay in the heap as tombstones; dispatch skips any
//!   entry whose outcome channel is already gone
//! - The scheduler never converts errors: it forwards the operation's
//!   outcome, and synthesizes `Aborted` only for jobs it discards itself

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{GovernorError, GovernorResult};
use crate::scheduler::job::{QueuedJobInfo, SchedulerStatus, StatusTotals};
use crate::scheduler::queue::{PriorityQueue, QueueEntry};

/// A handle to an enqueued job.
///
/// Resolves with the operation's outcome once the job has run, or with
/// [`GovernorError::Aborted`] if the job was cancelled while queued.
pub struct JobHandle<T> {
    id: Uuid,
    rx: oneshot::Receiver<GovernorResult<T>>,
}

impl<T> JobHandle<T> {
    /// The job's identity, usable with [`PriorityScheduler::cancel`].
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T> Future for JobHandle<T> {
    type Output = GovernorResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            // Scheduler dropped the sender without settling; treat as abort.
            Err(_) => Err(GovernorError::Aborted),
        })
    }
}

struct SchedulerState<T> {
    queue: PriorityQueue<T>,
    /// Outcome senders for *queued* jobs only; dispatch moves a job's
    /// sender into its task, cancel removes it (tombstoning the entry).
    outcomes: HashMap<Uuid, oneshot::Sender<GovernorResult<T>>>,
    running: usize,
    next_seq: u64,
    totals: StatusTotals,
}

struct SchedulerInner<T> {
    max_concurrent: usize,
    state: Mutex<SchedulerState<T>>,
}

/// Priority scheduler bounding global concurrency.
pub struct PriorityScheduler<T> {
    inner: Arc<SchedulerInner<T>>,
}

impl<T> Clone for PriorityScheduler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + 'static> PriorityScheduler<T> {
    /// Create a scheduler that runs at most `max_concurrent` jobs at once.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                max_concurrent,
                state: Mutex::new(SchedulerState {
                    queue: PriorityQueue::new(),
                    outcomes: HashMap::new(),
                    running: 0,
                    next_seq: 0,
                    totals: StatusTotals::default(),
                }),
            }),
        }
    }

    /// Enqueue an operation at the given priority (higher runs first;
    /// equal priorities dispatch in arrival order).
    pub fn enqueue<F, Fut>(&self, priority: i32, operation: F) -> JobHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = GovernorResult<T>> + Send + 'static,
    {
        self.enqueue_with_id(Uuid::new_v4(), priority, operation)
    }

    /// Enqueue under a caller-chosen id (must be unique per scheduler).
    pub fn enqueue_with_id<F, Fut>(&self, id: Uuid, priority: i32, operation: F) -> JobHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = GovernorResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.inner.state.lock().expect("scheduler state poisoned");
            let seq = state.next_seq;
            state.next_seq += 1;
            state.outcomes.insert(id, tx);
            state.queue.push(QueueEntry {
                id,
                priority,
                seq,
                enqueued_at: Instant::now(),
                operation: Box::new(move || -> crate::scheduler::job::JobFuture<T> {
                    Box::pin(operation())
                }),
            });
            tracing::debug!(
                job_id = %id,
                priority,
                queued = state.queue.len(),
                "Job enqueued"
            );
        }

        // Dispatch on the next scheduling turn, so a burst of enqueues is
        // fully queued before the first dispatch decision sees it.
        let inner = self.inner.clone();
        tokio::spawn(async move {
            Self::dispatch(&inner);
        });

        JobHandle { id, rx }
    }

    /// Cancel a queued job. Running jobs are not preemptible here; cancel
    /// in-flight work through the deadline guard instead.
    pub fn cancel(&self, id: Uuid) -> bool {
        let tx = {
            let mut state = self.inner.state.lock().expect("scheduler state poisoned");
            let tx = state.outcomes.remove(&id);
            if tx.is_some() {
                state.totals.cancelled += 1;
            }
            tx
        };
        match tx {
            Some(tx) => {
                tracing::debug!(job_id = %id, "Queued job cancelled");
                let _ = tx.send(Err(GovernorError::Aborted));
                true
            }
            None => false,
        }
    }

    /// Cancel every queued job; returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let senders: Vec<oneshot::Sender<GovernorResult<T>>> = {
            let mut state = self.inner.state.lock().expect("scheduler state poisoned");
            let senders: Vec<_> = state.outcomes.drain().map(|(_, tx)| tx).collect();
            state.totals.cancelled += senders.len() as u64;
            // Every remaining heap entry is now a tombstone.
            state.queue.clear();
            senders
        };
        let cancelled = senders.len();
        for tx in senders {
            let _ = tx.send(Err(GovernorError::Aborted));
        }
        if cancelled > 0 {
            tracing::info!(cancelled, "Cancelled all queued jobs");
        }
        cancelled
    }

    /// Point-in-time view of the scheduler.
    pub fn status(&self) -> SchedulerStatus {
        let state = self.inner.state.lock().expect("scheduler state poisoned");
        let now = Instant::now();
        let mut queued_jobs: Vec<QueuedJobInfo> = state
            .queue
            .iter()
            .filter(|entry| state.outcomes.contains_key(&entry.id))
            .map(|entry| QueuedJobInfo {
                id: entry.id,
                priority: entry.priority,
                queued_for_ms: now.duration_since(entry.enqueued_at).as_millis() as u64,
            })
            .collect();
        queued_jobs.sort_by(|a, b| b.priority.cmp(&a.priority));

        SchedulerStatus {
            queued: state.outcomes.len(),
            running: state.running,
            max_concurrent: self.inner.max_concurrent,
            totals: state.totals,
            queued_jobs,
        }
    }

    /// Zero the per-status totals.
    pub fn reset_counters(&self) {
        let mut state = self.inner.state.lock().expect("scheduler state poisoned");
        state.totals = StatusTotals::default();
    }

    /// Admit queued jobs while capacity remains.
    fn dispatch(inner: &Arc<SchedulerInner<T>>) {
        loop {
            let (entry, tx) = {
                let mut state = inner.state.lock().expect("scheduler state poisoned");
                if state.running >= inner.max_concurrent {
                    return;
                }
                loop {
                    match state.queue.pop() {
                        None => return,
                        Some(entry) => {
                            if let Some(tx) = state.outcomes.remove(&entry.id) {
                                state.running += 1;
                                break (entry, tx);
                            }
                            // Tombstone of a cancelled job; skip it.
                        }
                    }
                }
            };

            let inner = inner.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                tracing::debug!(
                    job_id = %entry.id,
                    priority = entry.priority,
                    waited_ms = started.duration_since(entry.enqueued_at).as_millis() as u64,
                    "Job dispatched"
                );

                let result = (entry.operation)().await;

                {
                    let mut state = inner.state.lock().expect("scheduler state poisoned");
                    state.running -= 1;
                    match &result {
                        Ok(_) => state.totals.completed += 1,
                        Err(_) => state.totals.failed += 1,
                    }
                }

                // Caller may have gone away; late settlement is a no-op.
                let _ = tx.send(result);

                // Settlement frees a slot; drain from this fresh task.
                Self::dispatch(&inner);
            });
        }
    }
}
