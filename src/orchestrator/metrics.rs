//! Aggregate request metrics.
//!
//! Counters and a rolling latency window owned by one orchestrator
//! instance, mutated only when a request fully settles. Snapshots are
//! read-only and safe to poll at any frequency.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// Completions kept in the rolling latency window.
const LATENCY_WINDOW: usize = 100;

#[derive(Debug, Default)]
struct MetricsInner {
    total: u64,
    successes: u64,
    failures: u64,
    latencies: VecDeque<Duration>,
}

/// Read-only view of the aggregate counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    /// Mean latency over the last 100 completions, in milliseconds.
    pub avg_latency_ms: f64,
    /// Completions currently in the rolling window.
    pub latency_samples: usize,
}

/// Settlement-time metrics recorder.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    inner: Mutex<MetricsInner>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one terminal settlement. Latency is absent for requests that
    /// never ran (cancelled while queued); those count toward the failure
    /// total but not the latency window.
    pub fn record_outcome(&self, success: bool, latency: Option<Duration>) {
        let mut inner = self.inner.lock().expect("metrics state poisoned");
        inner.total += 1;
        if success {
            inner.successes += 1;
        } else {
            inner.failures += 1;
        }
        if let Some(latency) = latency {
            if inner.latencies.len() == LATENCY_WINDOW {
                inner.latencies.pop_front();
            }
            inner.latencies.push_back(latency);
        }
    }

    /// Current aggregate counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().expect("metrics state poisoned");
        let avg_latency_ms = if inner.latencies.is_empty() {
            0.0
        } else {
            let sum_ms: f64 = inner
                .latencies
                .iter()
                .map(|d| d.as_secs_f64() * 1_000.0)
                .sum();
            sum_ms / inner.latencies.len() as f64
        };
        MetricsSnapshot {
            total: inner.total,
            successes: inner.successes,
            failures: inner.failures,
            avg_latency_ms,
            latency_samples: inner.latencies.len(),
        }
    }

    /// Zero all counters and drop the latency window.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("metrics state poisoned");
        *inner = MetricsInner::default();
    }
}
