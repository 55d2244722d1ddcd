//! Priority scheduling subsystem.
//!
//! # Data Flow
//! ```text
//! enqueue(priority, op)
//!     → queue.rs (heap keyed on priority desc, arrival seq asc)
//!     → dispatcher.rs (admit while running < max_concurrent)
//!     → spawned job task (runs op, settles the JobHandle)
//!     → settlement re-enters dispatch, draining the queue
//! ```
//!
//! # Design Decisions
//! - Running jobs are never preempted; only queued jobs can be cancelled
//! - FIFO within a priority band, re-evaluated at each dispatch decision
//! - The concurrency cap is enforced under one mutex, never held across await

pub mod dispatcher;
pub mod job;
pub mod queue;

pub use dispatcher::{JobHandle, PriorityScheduler};
pub use job::{QueuedJobInfo, SchedulerStatus, StatusTotals};
