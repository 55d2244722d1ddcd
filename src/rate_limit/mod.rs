//! Rate limiting subsystem.
//!
//! # Data Flow
//! ```text
//! admit(priority)
//!     → window.rs (prune aged tickets, check remaining capacity)
//!     → capacity: record ticket, hand out AdmissionGuard
//!     → no capacity: park in priority-ordered wait list
//!     → guard drop OR ticket age-out → drain wait list
//! ```
//!
//! # Design Decisions
//! - A ticket counts against the window until it ages out or its operation
//!   completes, whichever comes first
//! - Waiting is the default; `try_admit` is the opt-out that surfaces
//!   `RateLimitExceeded` instead

pub mod window;

pub use window::{AdmissionGuard, RateWindow, RateWindowStatus};
