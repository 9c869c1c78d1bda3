use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::connection::{DbConnection, SharedConnection};
use crate::operation::SqlOp;

/// The per-connection execution loop.
///
/// Each cycle sleeps for the poll interval, then exhaustively drains the
/// delayed queue followed by the serial queue, executing every operation
/// under the connection guard. The serial queue is the only place this crate
/// guarantees submission order.
pub(crate) struct Worker<C: DbConnection> {
    conn: SharedConnection<C>,
    delayed: UnboundedReceiver<SqlOp>,
    serial: UnboundedReceiver<SqlOp>,
    serial_pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
    poll_interval: Duration,
    ping_every_loops: u64,
}

impl<C: DbConnection> Worker<C> {
    pub(crate) fn new(
        conn: SharedConnection<C>,
        delayed: UnboundedReceiver<SqlOp>,
        serial: UnboundedReceiver<SqlOp>,
        serial_pending: Arc<AtomicUsize>,
        cancel: CancellationToken,
        config: &RelayConfig,
    ) -> Self {
        Self {
            conn,
            delayed,
            serial,
            serial_pending,
            cancel,
            poll_interval: config.poll_interval(),
            ping_every_loops: config.ping_every_loops(),
        }
    }

    pub(crate) async fn run(mut self) {
        let mut loop_counter: u64 = 0;

        while !self.cancel.is_cancelled() {
            // A stop requested mid-sleep is observed on the next pass; the
            // teardown drain below covers anything enqueued meanwhile.
            sleep(self.poll_interval).await;

            self.process_requests().await;

            loop_counter += 1;
            if loop_counter >= self.ping_every_loops {
                loop_counter = 0;
                self.conn.lock().await.ping().await;
            }
        }

        // Teardown: refuse new submissions, then drain whatever made it in
        // during the shutdown window. Nothing enqueued is ever discarded.
        self.delayed.close();
        self.serial.close();
        self.process_requests().await;

        tracing::debug!("sql relay worker terminated");
    }

    async fn process_requests(&mut self) {
        while let Ok(op) = self.delayed.try_recv() {
            Self::run_op(&self.conn, op).await;
        }

        while let Ok(op) = self.serial.try_recv() {
            self.serial_pending.fetch_sub(1, Ordering::AcqRel);
            Self::run_op(&self.conn, op).await;
        }
    }

    async fn run_op(conn: &SharedConnection<C>, op: SqlOp) {
        if let Err(err) = op.execute(conn).await {
            tracing::debug!(error = %err, "delayed operation failed");
        }
    }
}
