use thiserror::Error;

/// Errors surfaced by the relay.
///
/// Failures stay local: the worker loop logs and discards them, a failed
/// operation simply does not apply (see the crate docs for the propagation
/// policy).
#[derive(Debug, Error)]
pub enum SqlRelayError {
    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The result queue this operation was bound to has been dropped.
    #[error("result queue closed before callback delivery")]
    ResultQueueClosed,

    /// The worker already stopped and closed its queues; the operation was
    /// not enqueued.
    #[error("worker stopped; operation rejected")]
    WorkerStopped,

    #[error("holder index {index} out of range (size: {size})")]
    HolderIndexOutOfRange { index: usize, size: usize },

    #[error("holder slot {index} already contains a query")]
    HolderSlotOccupied { index: usize },

    /// A formatted query exceeded [`crate::MAX_QUERY_LEN`]; nothing was
    /// stored (queries are never truncated and executed).
    #[error("formatted query length {len} exceeds maximum {max}")]
    QueryTooLong { len: usize, max: usize },
}
