//! Convenient imports for common functionality.
//!
//! Re-exports the types most callers need to submit operations and drain
//! their result queue.

pub use crate::callback::{CallbackResult, FnCallback, QueryCallback};
pub use crate::config::RelayConfig;
pub use crate::connection::{DbConnection, SharedConnection};
pub use crate::error::SqlRelayError;
pub use crate::holder::QueryHolder;
pub use crate::operation::SqlOp;
pub use crate::relay::SqlRelay;
pub use crate::result_queue::{ResultQueue, ResultSink};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::types::RowValues;
