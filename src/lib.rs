//! Asynchronous SQL execution relay.
//!
//! This crate decouples application code from blocking database work: SQL
//! operations are submitted to per-connection worker loops and executed there,
//! while results travel back to the submitting side through a polled,
//! thread-safety-aware callback queue.
//!
//! The physical driver stays outside the crate; anything implementing
//! [`DbConnection`] can sit behind a relay.
//!
//! ```rust,no_run
//! use sql_relay::prelude::*;
//!
//! # async fn demo(conn: impl DbConnection) -> Result<(), SqlRelayError> {
//! let mut results = ResultQueue::new(&RelayConfig::default());
//! let sink = results.sink();
//! let relay = SqlRelay::spawn(conn, &RelayConfig::default());
//!
//! // Fire and forget.
//! relay.execute("UPDATE characters SET online = 0")?;
//!
//! // Query with a callback delivered on the next `update` call.
//! relay.async_query(
//!     "SELECT guid FROM characters",
//!     FnCallback::thread_unsafe(|result| {
//!         let _rows = result.into_rows();
//!     }),
//!     &sink,
//! )?;
//!
//! // Caller's tick loop.
//! results.update(None).await;
//!
//! relay.shutdown().await;
//! # Ok(()) }
//! ```

mod callback;
mod config;
mod connection;
mod error;
mod holder;
mod operation;
mod relay;
mod result_queue;
mod results;
mod types;
mod worker;

pub mod prelude;
pub mod test_utils;

pub use callback::{CallbackResult, FnCallback, QueryCallback};
pub use config::RelayConfig;
pub use connection::{DbConnection, SharedConnection};
pub use error::SqlRelayError;
pub use holder::{MAX_QUERY_LEN, QueryHolder};
pub use operation::SqlOp;
pub use relay::SqlRelay;
pub use result_queue::{ResultQueue, ResultSink};
pub use results::{CustomDbRow, ResultSet};
pub use types::RowValues;
