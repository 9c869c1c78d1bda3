use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sql_relay::prelude::*;

#[tokio::test]
async fn unbounded_update_drains_the_entire_unsafe_backlog() {
    let mut queue = ResultQueue::new(&RelayConfig::default());
    let sink = queue.sink();
    let delivered = Arc::new(Mutex::new(Vec::new()));

    for i in 0..10 {
        let delivered = delivered.clone();
        sink.push(Box::new(FnCallback::thread_unsafe(move |_| {
            delivered.lock().unwrap().push(i);
        })))
        .unwrap();
    }

    queue.update(None).await;

    assert_eq!(*delivered.lock().unwrap(), (0..10).collect::<Vec<_>>());
    assert_eq!(queue.pending_unsafe(), 0);
}

#[tokio::test]
async fn small_budget_stops_early_and_resumes_next_call() {
    let mut queue = ResultQueue::new(&RelayConfig::default());
    let sink = queue.sink();
    let delivered = Arc::new(Mutex::new(Vec::new()));

    for i in 0..5 {
        let delivered = delivered.clone();
        sink.push(Box::new(FnCallback::thread_unsafe(move |_| {
            // Make each delivery long enough to blow a 1ms budget.
            std::thread::sleep(Duration::from_millis(5));
            delivered.lock().unwrap().push(i);
        })))
        .unwrap();
    }

    queue.update(Some(Duration::from_millis(1))).await;
    let after_first = delivered.lock().unwrap().len();
    assert!(after_first >= 1, "budget still delivers at least one");
    assert!(after_first < 5, "budget must stop the drain early");
    assert_eq!(queue.pending_unsafe(), 5 - after_first);

    queue.update(None).await;

    // Every callback delivered exactly once, in order, across both calls.
    assert_eq!(*delivered.lock().unwrap(), (0..5).collect::<Vec<_>>());
    assert_eq!(queue.pending_unsafe(), 0);
}

#[tokio::test]
async fn thread_safe_callbacks_complete_before_update_returns() {
    let mut queue = ResultQueue::new(&RelayConfig::default());
    let sink = queue.sink();
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let count = count.clone();
        sink.push(Box::new(FnCallback::thread_safe(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })))
        .unwrap();
    }

    queue.update(None).await;

    // The end-of-call barrier guarantees the pooled batch is done here.
    assert_eq!(count.load(Ordering::SeqCst), 20);
    assert_eq!(queue.pending_unsafe(), 0);
}

#[tokio::test]
async fn cancel_all_fires_every_pending_callback_with_empty_result() {
    let mut queue = ResultQueue::new(&RelayConfig::default());
    let sink = queue.sink();
    let empties = Arc::new(AtomicUsize::new(0));

    for i in 0..7 {
        let empties = empties.clone();
        let callback = move |result: CallbackResult| {
            assert!(result.is_empty());
            empties.fetch_add(1, Ordering::SeqCst);
        };
        // Mix of classifications; cancellation ignores the split.
        if i % 2 == 0 {
            sink.push(Box::new(FnCallback::thread_safe(callback))).unwrap();
        } else {
            sink.push(Box::new(FnCallback::thread_unsafe(callback)))
                .unwrap();
        }
    }

    queue.cancel_all();

    assert_eq!(empties.load(Ordering::SeqCst), 7);
    assert_eq!(queue.pending_unsafe(), 0);
}

#[tokio::test]
async fn sink_reports_closure_after_queue_drop() {
    let queue = ResultQueue::new(&RelayConfig::default());
    let sink = queue.sink();
    assert!(!sink.is_closed());

    drop(queue);

    assert!(sink.is_closed());
    let err = sink.push(Box::new(FnCallback::thread_unsafe(|_| {})));
    assert!(matches!(err, Err(SqlRelayError::ResultQueueClosed)));
}
