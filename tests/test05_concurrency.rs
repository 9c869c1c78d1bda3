use std::sync::Arc;
use std::time::Duration;

use sql_relay::prelude::*;
use sql_relay::test_utils::FakeConnection;

/// Extract the OP numbers a given producer's statements executed in.
fn producer_sequence(calls: &[String], producer: usize) -> Vec<usize> {
    let prefix = format!("execute:P{producer} OP");
    calls
        .iter()
        .filter_map(|call| call.strip_prefix(&prefix))
        .map(|n| n.parse().unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn guard_admits_one_call_at_a_time_under_concurrent_producers() {
    const PRODUCERS: usize = 4;
    const OPS_PER_PRODUCER: usize = 50;

    let conn = FakeConnection::new();
    let handle = conn.handle();
    let config = RelayConfig::default().with_poll_interval_ms(1);
    let relay = Arc::new(SqlRelay::spawn(conn, &config));

    let mut producers = Vec::new();
    for p in 0..PRODUCERS {
        let relay = relay.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..OPS_PER_PRODUCER {
                let op = SqlOp::plain(format!("P{p} OP{i}"));
                // Half the producers use the serial queue, half the delayed
                // queue, to keep both paths busy at once.
                if p % 2 == 0 {
                    relay.submit(op).unwrap();
                } else {
                    relay.submit_serial(op).unwrap();
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while handle.calls().len() < PRODUCERS * OPS_PER_PRODUCER
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let calls = handle.calls();
    assert_eq!(calls.len(), PRODUCERS * OPS_PER_PRODUCER);
    assert_eq!(handle.max_in_flight(), 1, "guard must serialize the connection");

    // FIFO holds per producer on the serial queue.
    for p in (0..PRODUCERS).filter(|p| p % 2 == 1) {
        let sequence = producer_sequence(&calls, p);
        assert_eq!(sequence, (0..OPS_PER_PRODUCER).collect::<Vec<_>>());
    }
}
