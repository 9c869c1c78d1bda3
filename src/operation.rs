use crate::callback::{CallbackResult, QueryCallback};
use crate::connection::{DbConnection, SharedConnection};
use crate::error::SqlRelayError;
use crate::holder::QueryHolder;
use crate::result_queue::ResultSink;
use crate::types::RowValues;

/// A unit of database work, executed once by a worker under its connection
/// guard and then dropped, whatever the outcome.
///
/// Ownership moves from the producer into a queue, then into the worker;
/// there is no retry and no sharing across that transfer.
pub enum SqlOp {
    /// A plain SQL statement.
    Plain(String),
    /// A precompiled statement by index, with its bound parameters.
    Prepared {
        index: usize,
        params: Vec<RowValues>,
    },
    /// An ordered, all-or-nothing group of operations.
    Transaction(Vec<SqlOp>),
    /// A query whose rows are delivered through a callback.
    Query {
        sql: String,
        callback: Box<dyn QueryCallback>,
        sink: ResultSink,
    },
    /// A [`QueryHolder`] batch; the holder travels back inside the callback.
    HolderBatch {
        holder: QueryHolder,
        callback: Box<dyn QueryCallback>,
        sink: ResultSink,
    },
}

impl SqlOp {
    #[must_use]
    pub fn plain(sql: impl Into<String>) -> Self {
        SqlOp::Plain(sql.into())
    }

    #[must_use]
    pub fn prepared(index: usize, params: Vec<RowValues>) -> Self {
        SqlOp::Prepared { index, params }
    }

    #[must_use]
    pub fn transaction(ops: Vec<SqlOp>) -> Self {
        SqlOp::Transaction(ops)
    }

    #[must_use]
    pub fn query(sql: impl Into<String>, callback: impl QueryCallback, sink: &ResultSink) -> Self {
        SqlOp::Query {
            sql: sql.into(),
            callback: Box::new(callback),
            sink: sink.clone(),
        }
    }

    #[must_use]
    pub fn holder_batch(
        holder: QueryHolder,
        callback: impl QueryCallback,
        sink: &ResultSink,
    ) -> Self {
        SqlOp::HolderBatch {
            holder,
            callback: Box::new(callback),
            sink: sink.clone(),
        }
    }

    /// Acquire the connection guard and execute.
    ///
    /// Two cases never touch the connection: an empty transaction succeeds
    /// trivially, and a result-bearing operation whose queue is already gone
    /// fails up front (a producer error, not a database error).
    pub(crate) async fn execute<C: DbConnection>(
        self,
        conn: &SharedConnection<C>,
    ) -> Result<(), SqlRelayError> {
        if let SqlOp::Transaction(ops) = &self {
            if ops.is_empty() {
                return Ok(());
            }
        }

        if let SqlOp::Query { sink, .. } | SqlOp::HolderBatch { sink, .. } = &self {
            if sink.is_closed() {
                return Err(SqlRelayError::ResultQueueClosed);
            }
        }

        let mut guard = conn.lock().await;
        self.execute_locked(&mut *guard).await
    }

    /// Execute against an already-locked connection. A transaction holds the
    /// guard once for its entire member sequence by running members through
    /// this entry point.
    async fn execute_locked<C: DbConnection>(self, conn: &mut C) -> Result<(), SqlRelayError> {
        match self {
            SqlOp::Plain(sql) => conn.execute(&sql).await,

            SqlOp::Prepared { index, params } => conn.execute_stmt(index, &params).await,

            SqlOp::Transaction(ops) => {
                if ops.is_empty() {
                    return Ok(());
                }

                conn.begin_transaction().await?;
                for op in ops {
                    // First failing member aborts the whole sequence; the
                    // remaining members are dropped unexecuted.
                    if let Err(err) = Box::pin(op.execute_locked(conn)).await {
                        if let Err(rb) = conn.rollback_transaction().await {
                            tracing::warn!(error = %rb, "rollback failed after aborted transaction");
                        }
                        return Err(err);
                    }
                }
                conn.commit_transaction().await
            }

            SqlOp::Query {
                sql,
                mut callback,
                sink,
            } => {
                let result = match conn.query(&sql).await {
                    Ok(rows) => CallbackResult::Rows(rows),
                    Err(err) => {
                        tracing::debug!(error = %err, query = %sql, "async query failed");
                        CallbackResult::Empty
                    }
                };
                callback.set_result(result);
                sink.push(callback)
            }

            SqlOp::HolderBatch {
                mut holder,
                mut callback,
                sink,
            } => {
                for index in 0..holder.len() {
                    let Some(sql) = holder.query_text(index).map(str::to_owned) else {
                        continue;
                    };
                    // A failing slot stays empty; siblings still run.
                    let result = match conn.query(&sql).await {
                        Ok(rows) => Some(rows),
                        Err(err) => {
                            tracing::debug!(error = %err, index, query = %sql, "holder slot query failed");
                            None
                        }
                    };
                    holder.set_result(index, result);
                }

                callback.set_result(CallbackResult::Holder(holder));
                sink.push(callback)
            }
        }
    }
}
