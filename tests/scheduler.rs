//! Dispatch-order and concurrency properties of the priority scheduler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use request_governor::scheduler::PriorityScheduler;
use request_governor::GovernorError;

mod common;

use common::ConcurrencyProbe;

#[tokio::test]
async fn test_concurrency_cap_never_exceeded() {
    let scheduler: PriorityScheduler<u32> = PriorityScheduler::new(3);
    let probe = ConcurrencyProbe::new();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let probe = probe.clone();
        handles.push(scheduler.enqueue(0, move || async move {
            probe.enter();
            tokio::time::sleep(Duration::from_millis(40)).await;
            probe.exit();
            Ok(0)
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert!(
        probe.max_seen() <= 3,
        "cap exceeded: {} ran concurrently",
        probe.max_seen()
    );
    assert_eq!(probe.max_seen(), 3, "cap should actually be reached");
}

#[tokio::test]
async fn test_priority_beats_arrival_order() {
    let scheduler: PriorityScheduler<u32> = PriorityScheduler::new(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    // Both queued before the first dispatch decision runs.
    let low = {
        let order = order.clone();
        scheduler.enqueue(1, move || async move {
            order.lock().unwrap().push("low");
            Ok(0)
        })
    };
    let high = {
        let order = order.clone();
        scheduler.enqueue(5, move || async move {
            order.lock().unwrap().push("high");
            Ok(0)
        })
    };

    low.await.unwrap();
    high.await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["high", "low"]);
}

#[tokio::test]
async fn test_fifo_within_priority_band() {
    let scheduler: PriorityScheduler<u32> = PriorityScheduler::new(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for index in 0..5u32 {
        let order = order.clone();
        handles.push(scheduler.enqueue(0, move || async move {
            order.lock().unwrap().push(index);
            Ok(index)
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_dispatch_order_cap_two_priorities_5_1_5() {
    let scheduler: PriorityScheduler<u32> = PriorityScheduler::new(2);
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for (index, priority) in [(0u32, 5), (1, 1), (2, 5)] {
        let order = order.clone();
        handles.push(scheduler.enqueue(priority, move || async move {
            order.lock().unwrap().push(index);
            tokio::time::sleep(Duration::from_millis(80)).await;
            Ok(index)
        }));
    }

    // Let the first dispatch round start its two slots.
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(
        *order.lock().unwrap(),
        vec![0, 2],
        "both priority-5 jobs should start first, FIFO between them"
    );

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 2, 1]);
}

#[tokio::test]
async fn test_cancel_queued_job_settles_aborted() {
    let scheduler: PriorityScheduler<u32> = PriorityScheduler::new(1);

    let running = scheduler.enqueue(0, || async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(1)
    });
    let queued = scheduler.enqueue(0, || async { Ok(2) });

    // Give dispatch a turn so the first job is running, the second queued.
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(scheduler.cancel(queued.id()));
    assert_eq!(queued.await, Err(GovernorError::Aborted));

    // Running jobs are not preemptible by the scheduler.
    assert!(!scheduler.cancel(running.id()));
    assert_eq!(running.await, Ok(1));

    let status = scheduler.status();
    assert_eq!(status.totals.cancelled, 1);
    assert_eq!(status.totals.completed, 1);
}

#[tokio::test]
async fn test_cancel_all_reports_count() {
    let scheduler: PriorityScheduler<u32> = PriorityScheduler::new(1);

    let running = scheduler.enqueue(0, || async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(0)
    });
    let queued_a = scheduler.enqueue(0, || async { Ok(1) });
    let queued_b = scheduler.enqueue(0, || async { Ok(2) });

    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(scheduler.cancel_all(), 2);
    assert_eq!(queued_a.await, Err(GovernorError::Aborted));
    assert_eq!(queued_b.await, Err(GovernorError::Aborted));
    assert_eq!(running.await, Ok(0));
}

#[tokio::test]
async fn test_status_snapshot_of_queued_jobs() {
    let scheduler: PriorityScheduler<u32> = PriorityScheduler::new(1);

    let _running = scheduler.enqueue(0, || async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(0)
    });
    let queued = scheduler.enqueue(7, || async { Ok(1) });

    tokio::time::sleep(Duration::from_millis(30)).await;

    let status = scheduler.status();
    assert_eq!(status.running, 1);
    assert_eq!(status.queued, 1);
    assert_eq!(status.max_concurrent, 1);
    assert_eq!(status.queued_jobs.len(), 1);
    assert_eq!(status.queued_jobs[0].id, queued.id());
    assert_eq!(status.queued_jobs[0].priority, 7);
}

#[tokio::test]
async fn test_forwarded_failures_count_as_failed() {
    let scheduler: PriorityScheduler<u32> = PriorityScheduler::new(2);
    let calls = Arc::new(AtomicUsize::new(0));

    let c = calls.clone();
    let failing = scheduler.enqueue(0, move || async move {
        c.fetch_add(1, Ordering::SeqCst);
        Err(GovernorError::Upstream { status: 502 })
    });

    assert_eq!(failing.await, Err(GovernorError::Upstream { status: 502 }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.status().totals.failed, 1);

    scheduler.reset_counters();
    assert_eq!(scheduler.status().totals.failed, 0);
}
