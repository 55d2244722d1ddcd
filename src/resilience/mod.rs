//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! One governed attempt:
//!     → deadline.rs (fresh token + timer per attempt)
//!     → On failure: retries.rs (classify, retry with backoff.rs delays)
//! ```
//!
//! # Design Decisions
//! - Deadlines are per attempt, not per request; every retry gets a fresh
//!   timeout budget
//! - Retries only for errors whose status is in the configured set;
//!   cancellation always wins
//! - All resilience logic is composable around an opaque operation

pub mod backoff;
pub mod deadline;
pub mod retries;

pub use deadline::DeadlineGuard;
pub use retries::RetryPolicy;
