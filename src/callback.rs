use crate::holder::QueryHolder;
use crate::results::ResultSet;

/// Payload delivered to a callback.
///
/// `Empty` covers both a failed query and a cancelled delivery; the callback
/// cannot tell the two apart, matching the "this statement ran or did not"
/// contract.
#[derive(Debug)]
pub enum CallbackResult {
    /// Rows from a single async query.
    Rows(ResultSet),
    /// The holder of a completed batch, results stored per slot.
    Holder(QueryHolder),
    /// No result: the query failed or the delivery was cancelled.
    Empty,
}

impl CallbackResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn into_rows(self) -> Option<ResultSet> {
        if let CallbackResult::Rows(rows) = self {
            Some(rows)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_holder(self) -> Option<QueryHolder> {
        if let CallbackResult::Holder(holder) = self {
            Some(holder)
        } else {
            None
        }
    }
}

/// The contract a result is delivered through.
///
/// The thread-safety classification is fixed at construction and decides
/// where the delivery action runs: thread-safe callbacks may be dispatched to
/// the pooled executor, thread-unsafe ones run inline on the thread draining
/// the [`crate::ResultQueue`]. `set_result` is called exactly once before
/// delivery; `invoke` consumes the callback, so delivery happens at most
/// once by construction.
pub trait QueryCallback: Send + 'static {
    fn is_thread_safe(&self) -> bool;

    fn set_result(&mut self, result: CallbackResult);

    /// The delivery action, performed on the receiving side.
    fn invoke(self: Box<Self>);
}

/// Closure-backed [`QueryCallback`].
///
/// ```rust
/// use sql_relay::prelude::*;
///
/// let cb = FnCallback::thread_safe(|result| {
///     if let Some(rows) = result.into_rows() {
///         println!("{} rows", rows.results.len());
///     }
/// });
/// # let _ = cb;
/// ```
pub struct FnCallback<F>
where
    F: FnOnce(CallbackResult) + Send + 'static,
{
    thread_safe: bool,
    result: Option<CallbackResult>,
    action: F,
}

impl<F> FnCallback<F>
where
    F: FnOnce(CallbackResult) + Send + 'static,
{
    /// A callback whose delivery action may run on a pooled worker.
    #[must_use]
    pub fn thread_safe(action: F) -> Self {
        Self {
            thread_safe: true,
            result: None,
            action,
        }
    }

    /// A callback whose delivery action must run inline on the thread that
    /// drains the result queue.
    #[must_use]
    pub fn thread_unsafe(action: F) -> Self {
        Self {
            thread_safe: false,
            result: None,
            action,
        }
    }
}

impl<F> QueryCallback for FnCallback<F>
where
    F: FnOnce(CallbackResult) + Send + 'static,
{
    fn is_thread_safe(&self) -> bool {
        self.thread_safe
    }

    fn set_result(&mut self, result: CallbackResult) {
        self.result = Some(result);
    }

    fn invoke(mut self: Box<Self>) {
        let result = self.result.take().unwrap_or(CallbackResult::Empty);
        (self.action)(result);
    }
}
