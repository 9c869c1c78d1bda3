use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::callback::QueryCallback;
use crate::config::RelayConfig;
use crate::connection::{DbConnection, SharedConnection};
use crate::error::SqlRelayError;
use crate::holder::QueryHolder;
use crate::operation::SqlOp;
use crate::result_queue::ResultSink;
use crate::worker::Worker;

/// Handle to one spawned worker and its queues.
///
/// Submission never blocks; the worker picks operations up on its next poll
/// cycle. Dropping the handle requests a cooperative stop, but
/// [`SqlRelay::shutdown`] is the orderly path: it waits for the worker's
/// final drain, so every submitted operation still executes.
pub struct SqlRelay {
    delayed: UnboundedSender<SqlOp>,
    serial: UnboundedSender<SqlOp>,
    serial_pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl SqlRelay {
    /// Spawn a worker owning `conn`, polling per `config`.
    #[must_use]
    pub fn spawn<C: DbConnection>(conn: C, config: &RelayConfig) -> Self {
        Self::spawn_shared(Arc::new(Mutex::new(conn)), config)
    }

    /// Spawn a worker around an already-shared connection. The caller keeps
    /// a handle to the mutex and competes for the guard like the worker
    /// does.
    #[must_use]
    pub fn spawn_shared<C: DbConnection>(conn: SharedConnection<C>, config: &RelayConfig) -> Self {
        let (delayed_tx, delayed_rx) = mpsc::unbounded_channel();
        let (serial_tx, serial_rx) = mpsc::unbounded_channel();
        let serial_pending = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let worker = Worker::new(
            conn,
            delayed_rx,
            serial_rx,
            serial_pending.clone(),
            cancel.clone(),
            config,
        );
        let join = tokio::spawn(worker.run());

        Self {
            delayed: delayed_tx,
            serial: serial_tx,
            serial_pending,
            cancel,
            join: Some(join),
        }
    }

    /// Fire-and-forget a plain statement on the delayed queue.
    ///
    /// # Errors
    /// Fails only if the worker already stopped.
    pub fn execute(&self, sql: impl Into<String>) -> Result<(), SqlRelayError> {
        self.submit(SqlOp::plain(sql))
    }

    /// Submit an operation to the delayed queue. No ordering is guaranteed
    /// across producers.
    ///
    /// # Errors
    /// Fails only if the worker already stopped.
    pub fn submit(&self, op: SqlOp) -> Result<(), SqlRelayError> {
        self.delayed
            .send(op)
            .map_err(|_| SqlRelayError::WorkerStopped)
    }

    /// Submit an operation to the serial queue: FIFO relative to every other
    /// operation submitted here.
    ///
    /// # Errors
    /// Fails only if the worker already stopped.
    pub fn submit_serial(&self, op: SqlOp) -> Result<(), SqlRelayError> {
        self.serial_pending.fetch_add(1, Ordering::AcqRel);
        self.serial.send(op).map_err(|_| {
            self.serial_pending.fetch_sub(1, Ordering::AcqRel);
            SqlRelayError::WorkerStopped
        })
    }

    /// Run `sql` on the worker and deliver its rows through `callback` on
    /// the queue behind `sink`.
    ///
    /// # Errors
    /// Fails only if the worker already stopped.
    pub fn async_query(
        &self,
        sql: impl Into<String>,
        callback: impl QueryCallback,
        sink: &ResultSink,
    ) -> Result<(), SqlRelayError> {
        self.submit(SqlOp::query(sql, callback, sink))
    }

    /// Run a holder batch on the worker's serial queue; the holder comes
    /// back inside the callback's [`crate::CallbackResult::Holder`].
    ///
    /// # Errors
    /// Fails only if the worker already stopped.
    pub fn submit_holder(
        &self,
        holder: QueryHolder,
        callback: impl QueryCallback,
        sink: &ResultSink,
    ) -> Result<(), SqlRelayError> {
        self.submit_serial(SqlOp::holder_batch(holder, callback, sink))
    }

    /// Whether serial operations are still waiting for the worker.
    /// Approximate: the count changes concurrently.
    #[must_use]
    pub fn has_pending_serial(&self) -> bool {
        self.serial_pending.load(Ordering::Acquire) > 0
    }

    /// Request a cooperative stop. The worker finishes its current cycle,
    /// drains both queues one final time, and terminates; latency is bounded
    /// by one poll interval plus in-flight execution.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop and wait for the worker's final drain to complete.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for SqlRelay {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
