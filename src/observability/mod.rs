//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (facade counters and histograms)
//!
//! Consumers:
//!     → whatever subscriber/exporter the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Request id flows through every log line as a structured field
//! - Metric updates are cheap facade calls; no exporter is bundled

pub mod logging;
pub mod metrics;
