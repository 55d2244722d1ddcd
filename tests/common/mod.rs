//! Shared utilities for integration testing.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use request_governor::{operation, GovernorError, Operation};

/// Operation that fails its first `failures` attempts with `status`, then
/// succeeds with `value`. Returns the operation and its call counter.
#[allow(dead_code)]
pub fn flaky_op(failures: u32, status: u16, value: u32) -> (Operation<u32>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let op = operation(move |_token| {
        let counter = counter.clone();
        async move {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            if call < failures {
                Err(GovernorError::Upstream { status })
            } else {
                Ok(value)
            }
        }
    });
    (op, calls)
}

/// Operation that sleeps for `delay`, then returns `value`.
#[allow(dead_code)]
pub fn slow_op(delay: Duration, value: u32) -> Operation<u32> {
    operation(move |_token| async move {
        tokio::time::sleep(delay).await;
        Ok(value)
    })
}

/// Operation that fails immediately with the given status.
#[allow(dead_code)]
pub fn failing_op(status: u16) -> Operation<u32> {
    operation(move |_token| async move { Err(GovernorError::Upstream { status }) })
}

/// Operation that never settles within any reasonable test horizon.
#[allow(dead_code)]
pub fn never_settling_op() -> Operation<u32> {
    operation(|_token| async {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok(0)
    })
}

/// Tracks how many operations run at once and the maximum ever observed.
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    max_seen: AtomicUsize,
}

#[allow(dead_code)]
impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max_seen(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }
}
