//! Sliding-window admission control.
//!
//! # Responsibilities
//! - Admit at most `max_requests` operations inside any rolling window
//! - Park over-limit requests in a priority-ordered wait list
//! - Free capacity when a ticket ages out of the window or its operation
//!   completes, whichever comes first
//!
//! # Design Decisions
//! - The wait list drains reactively on every completion, plus via a timer
//!   armed for the oldest ticket's expiry: no busy polling, no unbounded
//!   delay
//! - Admission hands out an RAII guard; dropping it releases the ticket on
//!   every settlement path
//! - The wait list orders by (priority desc, arrival asc), the same key the
//!   scheduler uses, so priority applies consistently at both admission
//!   points

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::oneshot;

use crate::config::RateLimitConfig;
use crate::error::{GovernorError, GovernorResult};

/// One admission inside the rolling window.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    id: u64,
    admitted_at: Instant,
}

/// A parked admission request.
struct Waiter {
    priority: i32,
    seq: u64,
    tx: oneshot::Sender<GovernorResult<u64>>,
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Waiter {}

impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiter {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: higher priority first, then earlier arrival.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct WindowState {
    tickets: Vec<Ticket>,
    waiters: BinaryHeap<Waiter>,
    next_ticket_id: u64,
    next_seq: u64,
    timer_armed: bool,
}

struct WindowInner {
    max_requests: usize,
    window: Duration,
    state: Mutex<WindowState>,
}

/// Point-in-time view of the rate window.
#[derive(Debug, Clone, Serialize)]
pub struct RateWindowStatus {
    pub in_window: usize,
    pub waiting: usize,
    pub max_requests: usize,
    pub window_ms: u64,
}

/// Sliding-window rate limiter with a priority-ordered wait list.
#[derive(Clone)]
pub struct RateWindow {
    inner: Arc<WindowInner>,
}

impl RateWindow {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            inner: Arc::new(WindowInner {
                max_requests,
                window,
                state: Mutex::new(WindowState {
                    tickets: Vec::new(),
                    waiters: BinaryHeap::new(),
                    next_ticket_id: 0,
                    next_seq: 0,
                    timer_armed: false,
                }),
            }),
        }
    }

    /// Build a window from the rate-limit section of the config.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_millis(config.window_ms))
    }

    /// Admit immediately or park until capacity frees.
    ///
    /// Returns an RAII guard whose drop releases the admission slot. Fails
    /// only with [`GovernorError::QueueCleared`] when the wait list is
    /// discarded underneath the caller.
    pub async fn admit(&self, priority: i32) -> GovernorResult<AdmissionGuard> {
        let rx = {
            let mut state = self.inner.state.lock().expect("rate window state poisoned");
            self.prune_locked(&mut state);

            if state.tickets.len() < self.inner.max_requests {
                let ticket_id = self.record_ticket_locked(&mut state);
                return Ok(AdmissionGuard {
                    window: self.clone(),
                    ticket_id,
                });
            }

            let (tx, rx) = oneshot::channel();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.waiters.push(Waiter { priority, seq, tx });
            tracing::debug!(
                priority,
                waiting = state.waiters.len(),
                "Rate window full, request parked"
            );
            rx
        };

        self.arm_timer();

        match rx.await {
            Ok(Ok(ticket_id)) => Ok(AdmissionGuard {
                window: self.clone(),
                ticket_id,
            }),
            Ok(Err(error)) => Err(error),
            // The window itself went away while we waited.
            Err(_) => Err(GovernorError::Aborted),
        }
    }

    /// Non-waiting admission: a full window fails immediately.
    pub fn try_admit(&self, _priority: i32) -> GovernorResult<AdmissionGuard> {
        let mut state = self.inner.state.lock().expect("rate window state poisoned");
        self.prune_locked(&mut state);

        if state.tickets.len() < self.inner.max_requests {
            let ticket_id = self.record_ticket_locked(&mut state);
            Ok(AdmissionGuard {
                window: self.clone(),
                ticket_id,
            })
        } else {
            Err(GovernorError::RateLimitExceeded {
                in_window: state.tickets.len(),
            })
        }
    }

    /// Admit (waiting if needed), run the operation, release on settlement.
    pub async fn throttle<T, F, Fut>(&self, priority: i32, operation: F) -> GovernorResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GovernorResult<T>>,
    {
        let _guard = self.admit(priority).await?;
        operation().await
    }

    /// Minimum time until at least one more admission is possible.
    /// Zero when capacity remains. Introspection only.
    pub fn wait_time(&self) -> Duration {
        let mut state = self.inner.state.lock().expect("rate window state poisoned");
        self.prune_locked(&mut state);
        self.wait_time_locked(&state)
    }

    /// Reject every parked request with `QueueCleared`; returns the count.
    pub fn clear_queue(&self) -> usize {
        let waiters = {
            let mut state = self.inner.state.lock().expect("rate window state poisoned");
            std::mem::take(&mut state.waiters)
        };
        let cleared = waiters.len();
        for waiter in waiters {
            let _ = waiter.tx.send(Err(GovernorError::QueueCleared));
        }
        if cleared > 0 {
            tracing::info!(cleared, "Rate window wait list cleared");
        }
        cleared
    }

    /// Point-in-time view of the window.
    pub fn status(&self) -> RateWindowStatus {
        let mut state = self.inner.state.lock().expect("rate window state poisoned");
        self.prune_locked(&mut state);
        RateWindowStatus {
            in_window: state.tickets.len(),
            waiting: state.waiters.len(),
            max_requests: self.inner.max_requests,
            window_ms: self.inner.window.as_millis() as u64,
        }
    }

    /// Drop tickets that have aged out of the rolling window.
    fn prune_locked(&self, state: &mut WindowState) {
        let Some(cutoff) = Instant::now().checked_sub(self.inner.window) else {
            return;
        };
        state.tickets.retain(|ticket| ticket.admitted_at > cutoff);
    }

    fn record_ticket_locked(&self, state: &mut WindowState) -> u64 {
        let id = state.next_ticket_id;
        state.next_ticket_id += 1;
        state.tickets.push(Ticket {
            id,
            admitted_at: Instant::now(),
        });
        id
    }

    fn wait_time_locked(&self, state: &WindowState) -> Duration {
        if state.tickets.len() < self.inner.max_requests {
            return Duration::ZERO;
        }
        match state.tickets.iter().map(|t| t.admitted_at).min() {
            Some(oldest) => (oldest + self.inner.window).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Release one admission slot and wake waiters.
    fn release(&self, ticket_id: u64) {
        {
            let mut state = self.inner.state.lock().expect("rate window state poisoned");
            state.tickets.retain(|ticket| ticket.id != ticket_id);
        }
        self.drain();
        self.arm_timer();
    }

    /// Admit parked requests while capacity remains.
    fn drain(&self) {
        let mut state = self.inner.state.lock().expect("rate window state poisoned");
        self.prune_locked(&mut state);
        while state.tickets.len() < self.inner.max_requests {
            let Some(waiter) = state.waiters.pop() else {
                break;
            };
            let ticket_id = self.record_ticket_locked(&mut state);
            if waiter.tx.send(Ok(ticket_id)).is_err() {
                // Waiter gave up while parked; take the ticket back.
                state.tickets.retain(|ticket| ticket.id != ticket_id);
            }
        }
    }

    /// Arm a wakeup for the oldest ticket's expiry while anyone waits.
    fn arm_timer(&self) {
        let sleep_for = {
            let mut state = self.inner.state.lock().expect("rate window state poisoned");
            if state.waiters.is_empty() || state.timer_armed {
                return;
            }
            state.timer_armed = true;
            self.wait_time_locked(&state)
        };

        // Guards can be dropped outside a runtime during teardown; there is
        // nothing left to wake in that case.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.inner
                .state
                .lock()
                .expect("rate window state poisoned")
                .timer_armed = false;
            return;
        };

        let window = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(sleep_for.max(Duration::from_millis(1))).await;
            {
                let mut state = window.inner.state.lock().expect("rate window state poisoned");
                state.timer_armed = false;
            }
            window.drain();
            window.arm_timer();
        });
    }
}

/// RAII admission slot: dropping it releases the ticket and drains the
/// wait list, so completions free capacity without any polling.
pub struct AdmissionGuard {
    window: RateWindow,
    ticket_id: u64,
}

impl std::fmt::Debug for AdmissionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGuard")
            .field("ticket_id", &self.ticket_id)
            .finish()
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.window.release(self.ticket_id);
    }
}
