//! Orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! execute(operation, options)
//!     → pipeline.rs: scheduler.enqueue (outermost)
//!         → rate_limit admission
//!         → retry loop (one rate admission covers all attempts)
//!         → per-attempt deadline guard
//!         → operation(token)
//!     → settlement: metrics.rs counters + lifecycle events
//! batch.rs: all / settle_all / first_to_finish / first_success,
//!     all built on execute()
//! ```

pub mod batch;
pub mod metrics;
pub mod pipeline;

pub use batch::BatchRequest;
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use pipeline::{
    operation, ExecuteOptions, GovernorStatus, Operation, OperationFuture, Orchestrator,
    RequestHandle,
};
