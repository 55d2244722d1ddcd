//! Metrics facade helpers.
//!
//! # Responsibilities
//! - Define the governor's metric names in one place
//! - Record settlement, retry, and rate-limit counters
//!
//! # Metrics
//! - `governor_requests_total` (counter): settled requests by outcome
//! - `governor_request_duration_seconds` (histogram): request latency
//! - `governor_retries_total` (counter): retry attempts spent
//! - `governor_rate_limited_total` (counter): non-waiting admissions denied
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; installing an exporter
//!   is the embedding application's business

use std::time::Duration;

use metrics::{counter, histogram};

/// Record one settled request.
pub fn record_request_outcome(outcome: &'static str, latency: Duration) {
    counter!("governor_requests_total", "outcome" => outcome).increment(1);
    histogram!("governor_request_duration_seconds").record(latency.as_secs_f64());
}

/// Record one retry attempt being spent.
pub fn record_retry() {
    counter!("governor_retries_total").increment(1);
}

/// Record a denied non-waiting admission.
pub fn record_rate_limited() {
    counter!("governor_rate_limited_total").increment(1);
}

/// Record one batch combinator invocation.
pub fn record_batch(kind: &'static str, count: usize) {
    counter!("governor_batches_total", "kind" => kind).increment(1);
    counter!("governor_batch_requests_total", "kind" => kind).increment(count as u64);
}
