//! Instrumented in-memory connection for exercising the relay without a
//! real database.
//!
//! `FakeConnection` records every call in submission order, tracks how many
//! calls are in flight at once (to check guard exclusivity), counts pings,
//! and can be scripted to fail statements matching a substring.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::connection::DbConnection;
use crate::error::SqlRelayError;
use crate::results::ResultSet;
use crate::types::RowValues;

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pings: AtomicUsize,
}

impl Recorder {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }
}

/// Shared view into a [`FakeConnection`]'s recorded activity.
#[derive(Clone)]
pub struct FakeConnectionHandle {
    recorder: Arc<Recorder>,
}

impl FakeConnectionHandle {
    /// Every call the connection observed, in execution order. Entries look
    /// like `execute:UPDATE x`, `query:SELECT 1`, `stmt:3`, `begin`,
    /// `commit`, `rollback`, `ping`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.recorder
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Peak number of concurrently in-flight connection calls.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.recorder.max_in_flight.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn pings(&self) -> usize {
        self.recorder.pings.load(Ordering::SeqCst)
    }
}

/// In-memory [`DbConnection`] for tests.
///
/// `query` answers with a single-row result set whose `sql` column carries
/// the query text, so end-to-end tests can assert exactly which statement
/// produced a delivery.
#[derive(Default)]
pub struct FakeConnection {
    recorder: Arc<Recorder>,
    fail_patterns: Vec<String>,
}

impl FakeConnection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Any statement or query whose text contains `pattern` fails.
    #[must_use]
    pub fn fail_matching(mut self, pattern: impl Into<String>) -> Self {
        self.fail_patterns.push(pattern.into());
        self
    }

    #[must_use]
    pub fn handle(&self) -> FakeConnectionHandle {
        FakeConnectionHandle {
            recorder: self.recorder.clone(),
        }
    }

    fn check_failure(&self, sql: &str) -> Result<(), SqlRelayError> {
        if self.fail_patterns.iter().any(|p| sql.contains(p.as_str())) {
            return Err(SqlRelayError::ExecutionError(format!(
                "scripted failure for: {sql}"
            )));
        }
        Ok(())
    }

    async fn observe(&self, call: String) {
        self.recorder.enter();
        self.recorder.record(call);
        // Yield while "executing" so overlapping calls would be visible in
        // the in-flight counter.
        tokio::task::yield_now().await;
        self.recorder.exit();
    }
}

#[async_trait]
impl DbConnection for FakeConnection {
    async fn execute(&mut self, sql: &str) -> Result<(), SqlRelayError> {
        self.observe(format!("execute:{sql}")).await;
        self.check_failure(sql)
    }

    async fn query(&mut self, sql: &str) -> Result<ResultSet, SqlRelayError> {
        self.observe(format!("query:{sql}")).await;
        self.check_failure(sql)?;

        let mut rs = ResultSet::with_capacity(1);
        rs.set_column_names(Arc::new(vec!["sql".to_string()]));
        rs.add_row_values(vec![RowValues::Text(sql.to_string())]);
        Ok(rs)
    }

    async fn execute_stmt(
        &mut self,
        index: usize,
        _params: &[RowValues],
    ) -> Result<(), SqlRelayError> {
        self.observe(format!("stmt:{index}")).await;
        Ok(())
    }

    async fn begin_transaction(&mut self) -> Result<(), SqlRelayError> {
        self.observe("begin".to_string()).await;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> Result<(), SqlRelayError> {
        self.observe("commit".to_string()).await;
        Ok(())
    }

    async fn rollback_transaction(&mut self) -> Result<(), SqlRelayError> {
        self.observe("rollback".to_string()).await;
        Ok(())
    }

    async fn ping(&mut self) {
        self.observe("ping".to_string()).await;
        self.recorder.pings.fetch_add(1, Ordering::SeqCst);
    }
}
