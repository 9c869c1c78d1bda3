use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::callback::{CallbackResult, QueryCallback};
use crate::config::RelayConfig;
use crate::error::SqlRelayError;

/// Producer handle for a [`ResultQueue`].
///
/// Workers push completed callbacks through a sink; the sink an operation
/// was bound to at construction is the queue its callback comes back on.
/// Cloning is cheap and pushing never blocks.
#[derive(Clone)]
pub struct ResultSink {
    tx: UnboundedSender<Box<dyn QueryCallback>>,
}

impl ResultSink {
    /// Whether the owning [`ResultQueue`] has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Hand a completed callback to the owning queue.
    ///
    /// # Errors
    /// Fails only if the owning queue has been dropped; the callback is lost
    /// in that case.
    pub fn push(&self, callback: Box<dyn QueryCallback>) -> Result<(), SqlRelayError> {
        self.tx
            .send(callback)
            .map_err(|_| SqlRelayError::ResultQueueClosed)
    }
}

/// Collects completed callbacks from workers and delivers them on the owning
/// side's schedule.
///
/// The queue is drained by calling [`ResultQueue::update`] from the owning
/// task, typically once per tick; nothing is delivered in between. On
/// shutdown, [`ResultQueue::cancel_all`] fires every still-pending callback
/// with an empty result so none is lost.
pub struct ResultQueue {
    tx: UnboundedSender<Box<dyn QueryCallback>>,
    rx: UnboundedReceiver<Box<dyn QueryCallback>>,
    unsafe_backlog: VecDeque<Box<dyn QueryCallback>>,
    pool: Arc<Semaphore>,
    warn_threshold: usize,
}

impl ResultQueue {
    #[must_use]
    pub fn new(config: &RelayConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            unsafe_backlog: VecDeque::new(),
            pool: Arc::new(Semaphore::new(config.callback_pool_size.max(1))),
            warn_threshold: config.unsafe_backlog_warn_threshold,
        }
    }

    /// A new producer handle for this queue.
    #[must_use]
    pub fn sink(&self) -> ResultSink {
        ResultSink {
            tx: self.tx.clone(),
        }
    }

    /// Thread-unsafe callbacks still waiting for inline delivery.
    #[must_use]
    pub fn pending_unsafe(&self) -> usize {
        self.unsafe_backlog.len()
    }

    /// Drain and deliver completed callbacks.
    ///
    /// Everything currently inbound is classified first: thread-safe
    /// callbacks are dispatched to the pooled executor, thread-unsafe ones
    /// join the inline FIFO. The FIFO is then delivered in order until
    /// `budget` elapses (`None` means no limit); leftovers keep their order
    /// for the next call, none skipped, none duplicated. Before returning,
    /// the call waits for the pooled batch it submitted, so thread-safe
    /// delivery never lags more than one `update` behind queueing.
    pub async fn update(&mut self, budget: Option<Duration>) {
        let begin = Instant::now();
        let mut batch: Vec<JoinHandle<()>> = Vec::new();

        while let Ok(callback) = self.rx.try_recv() {
            if callback.is_thread_safe() {
                let pool = self.pool.clone();
                batch.push(tokio::spawn(async move {
                    let Ok(_permit) = pool.acquire_owned().await else {
                        return;
                    };
                    callback.invoke();
                }));
            } else {
                self.unsafe_backlog.push_back(callback);
            }
        }

        while let Some(callback) = self.unsafe_backlog.pop_front() {
            callback.invoke();
            if let Some(budget) = budget {
                if begin.elapsed() > budget {
                    break;
                }
            }
        }

        if self.unsafe_backlog.len() > self.warn_threshold {
            tracing::warn!(
                pending = self.unsafe_backlog.len(),
                "unsafe callback backlog is falling behind"
            );
        }

        // Barrier for this call's pooled batch.
        for handle in batch {
            let _ = handle.await;
        }
    }

    /// Emergency drain for shutdown: every callback still inbound fires
    /// synchronously with an empty result, exactly once. The inline FIFO and
    /// the pooled executor are not involved.
    pub fn cancel_all(&mut self) {
        while let Ok(mut callback) = self.rx.try_recv() {
            callback.set_result(CallbackResult::Empty);
            callback.invoke();
        }
    }
}
