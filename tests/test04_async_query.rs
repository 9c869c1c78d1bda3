use std::sync::{Arc, Mutex};
use std::time::Duration;

use sql_relay::prelude::*;
use sql_relay::test_utils::FakeConnection;

#[tokio::test(start_paused = true)]
async fn async_query_delivers_rows_once_after_update() {
    let config = RelayConfig::default();
    let conn = FakeConnection::new();
    let handle = conn.handle();
    let relay = SqlRelay::spawn(conn, &config);
    let mut queue = ResultQueue::new(&config);
    let sink = queue.sink();

    let delivered: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let delivered2 = delivered.clone();
    relay
        .async_query(
            "SELECT name FROM guilds",
            FnCallback::thread_safe(move |result| {
                let text = result.into_rows().and_then(|rs| {
                    rs.results[0]
                        .get("sql")
                        .and_then(|v| v.as_text().map(str::to_owned))
                });
                delivered2.lock().unwrap().push(text);
            }),
            &sink,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(15)).await;
    queue.update(None).await;

    assert_eq!(
        *delivered.lock().unwrap(),
        vec![Some("SELECT name FROM guilds".to_string())]
    );
    assert_eq!(
        handle.calls(),
        vec!["query:SELECT name FROM guilds".to_string()]
    );

    // A later update must not deliver it again.
    queue.update(None).await;
    assert_eq!(delivered.lock().unwrap().len(), 1);
    relay.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_query_still_delivers_an_empty_result() {
    let config = RelayConfig::default();
    let conn = FakeConnection::new().fail_matching("boom");
    let relay = SqlRelay::spawn(conn, &config);
    let mut queue = ResultQueue::new(&config);
    let sink = queue.sink();

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let delivered2 = delivered.clone();
    relay
        .async_query(
            "SELECT boom",
            FnCallback::thread_unsafe(move |result| {
                delivered2.lock().unwrap().push(result.is_empty());
            }),
            &sink,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(15)).await;
    queue.update(None).await;

    assert_eq!(*delivered.lock().unwrap(), vec![true]);
    relay.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn holder_batch_runs_slots_independently() {
    let config = RelayConfig::default();
    let conn = FakeConnection::new().fail_matching("boom");
    let handle = conn.handle();
    let relay = SqlRelay::spawn(conn, &config);
    let mut queue = ResultQueue::new(&config);
    let sink = queue.sink();

    let mut holder = QueryHolder::new(3);
    holder.set_query(0, "SELECT a").unwrap();
    // Slot 1 intentionally left without text.
    holder.set_query(2, "SELECT boom").unwrap();

    let returned: Arc<Mutex<Option<QueryHolder>>> = Arc::new(Mutex::new(None));
    let returned2 = returned.clone();
    relay
        .submit_holder(
            holder,
            FnCallback::thread_unsafe(move |result| {
                *returned2.lock().unwrap() = result.into_holder();
            }),
            &sink,
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(15)).await;
    queue.update(None).await;

    let mut holder = returned.lock().unwrap().take().expect("holder delivered");
    assert!(holder.take_result(0).is_some());
    assert!(holder.take_result(1).is_none(), "slot without text");
    assert!(holder.take_result(2).is_none(), "failed slot stays empty");
    assert!(holder.take_result(0).is_none(), "second take is empty");

    // The empty slot was never sent to the connection.
    assert_eq!(
        handle.calls(),
        vec!["query:SELECT a".to_string(), "query:SELECT boom".to_string()]
    );
    relay.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn query_bound_to_a_dropped_queue_never_runs() {
    let config = RelayConfig::default();
    let conn = FakeConnection::new();
    let handle = conn.handle();
    let relay = SqlRelay::spawn(conn, &config);

    let queue = ResultQueue::new(&config);
    let sink = queue.sink();
    drop(queue);

    relay
        .async_query("SELECT orphan", FnCallback::thread_safe(|_| {}), &sink)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(15)).await;

    // Producer error, not a database error: the connection is untouched.
    assert!(handle.calls().is_empty());
    relay.shutdown().await;
}
