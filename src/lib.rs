//! Governed execution for asynchronous operations.
//!
//! Turns an arbitrary async operation into a governed one: bounded
//! concurrency, fair priority ordering, rate-limited admission, automatic
//! retry with backoff, and per-attempt deadlines, composed so callers see
//! a single request-in/result-out contract.
//!
//! ```text
//! execute(operation, options)
//!     → scheduler (priority queue, at most max_concurrent running)
//!     → rate_limit (sliding-window admission)
//!     → resilience (retry loop; fresh deadline + token per attempt)
//!     → operation(cancellation_token)
//! ```

// Core subsystems
pub mod config;
pub mod orchestrator;
pub mod rate_limit;
pub mod resilience;
pub mod scheduler;

// Cross-cutting concerns
pub mod error;
pub mod events;
pub mod observability;

pub use config::GovernorConfig;
pub use error::{GovernorError, GovernorResult};
pub use events::{BatchKind, EventBus, GovernorEvent};
pub use orchestrator::{
    operation, BatchRequest, ExecuteOptions, GovernorStatus, Operation, Orchestrator,
};
