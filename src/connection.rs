use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::SqlRelayError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// A physical database connection as seen by the relay.
///
/// The real driver lives behind this trait; the relay only needs statement
/// execution, queries, prepared statements by index, transaction primitives,
/// and a liveness probe. All methods take `&mut self`: exclusivity is
/// enforced by the [`SharedConnection`] mutex, not by the driver.
#[async_trait]
pub trait DbConnection: Send + 'static {
    /// Run a statement, discarding any rows.
    async fn execute(&mut self, sql: &str) -> Result<(), SqlRelayError>;

    /// Run a query and collect its rows.
    async fn query(&mut self, sql: &str) -> Result<ResultSet, SqlRelayError>;

    /// Execute the precompiled statement at `index` with the given
    /// parameters.
    async fn execute_stmt(
        &mut self,
        index: usize,
        params: &[RowValues],
    ) -> Result<(), SqlRelayError>;

    async fn begin_transaction(&mut self) -> Result<(), SqlRelayError>;

    async fn commit_transaction(&mut self) -> Result<(), SqlRelayError>;

    async fn rollback_transaction(&mut self) -> Result<(), SqlRelayError>;

    /// Liveness probe; the result is ignored by the worker.
    async fn ping(&mut self);
}

/// One connection, one guard.
///
/// Holding the mutex for the duration of an operation is what keeps a ping
/// from interleaving with an in-progress statement, and a transaction's
/// members contiguous on the wire.
pub type SharedConnection<C> = Arc<Mutex<C>>;
