//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Respect `RUST_LOG` when set, fall back to the configured level
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Library code only emits events; installing the subscriber is opt-in

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `log_level` is the fallback when `RUST_LOG` is not set. Calling this
/// twice panics (the global subscriber can only be installed once), so
/// embedding applications with their own subscriber should skip it.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("request_governor={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
