//! Typed lifecycle notifications.
//!
//! The orchestrator publishes one event per observable transition on a
//! broadcast channel. Delivery is fire-and-forget: a send with no
//! subscribers (or a lagging subscriber) is silently dropped, so an
//! observer can never affect pipeline correctness. Per subscriber,
//! delivery order equals emission order.

use std::time::Duration;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::orchestrator::MetricsSnapshot;

/// Which batch combinator a batch event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Fail-fast all-succeed combinator.
    All,
    /// Wait-for-every-outcome combinator.
    SettleAll,
    /// First request to settle, success or failure.
    FirstToFinish,
    /// First request to succeed.
    FirstSuccess,
}

impl BatchKind {
    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::All => "all",
            BatchKind::SettleAll => "settle_all",
            BatchKind::FirstToFinish => "first_to_finish",
            BatchKind::FirstSuccess => "first_success",
        }
    }
}

/// Lifecycle events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum GovernorEvent {
    /// A request entered the pipeline.
    RequestStart { id: Uuid },
    /// An individual attempt (including each retry) is starting.
    RequestAttempt { id: Uuid, attempt: u32 },
    /// A request settled successfully.
    RequestSuccess { id: Uuid, latency: Duration },
    /// A request settled with a terminal failure.
    RequestError { id: Uuid, message: String },
    /// A batch combinator started.
    BatchStart { count: usize, kind: BatchKind },
    /// A batch combinator finished.
    BatchComplete { successful: usize, failed: usize },
    /// Aggregate metrics changed after a settlement.
    MetricsUpdate { snapshot: MetricsSnapshot },
}

/// Publisher side of the event channel.
///
/// Constructed once per orchestrator; cheap to clone into spawned tasks.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GovernorEvent>,
}

impl EventBus {
    /// Create a bus with the given subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<GovernorEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Errors (no subscribers) are ignored.
    pub fn publish(&self, event: GovernorEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
