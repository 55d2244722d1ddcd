//! Job bookkeeping types.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use uuid::Uuid;

use crate::error::GovernorResult;

/// The future produced by one job's operation.
pub type JobFuture<T> = Pin<Box<dyn Future<Output = GovernorResult<T>> + Send>>;

/// A queued job's operation, boxed for storage in the queue.
pub type JobOperation<T> = Box<dyn FnOnce() -> JobFuture<T> + Send>;

/// Terminal-state counters since the last reset.
///
/// A job is in exactly one state at a time: queued (tracked in the live
/// queue), running (bounded by the concurrency cap), or one of the three
/// terminal states counted here. Queued jobs may be dispatched or
/// cancelled; running jobs only settle to completed or failed, since the
/// scheduler never preempts them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

/// Point-in-time view of one queued job.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedJobInfo {
    pub id: Uuid,
    pub priority: i32,
    /// How long the job has been waiting for dispatch.
    pub queued_for_ms: u64,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub queued: usize,
    pub running: usize,
    pub max_concurrent: usize,
    pub totals: StatusTotals,
    pub queued_jobs: Vec<QueuedJobInfo>,
}
