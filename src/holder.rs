use std::fmt;

use crate::error::SqlRelayError;
use crate::results::ResultSet;

/// Upper bound on a formatted query. Formatting that would exceed it is
/// rejected outright rather than truncated and executed.
pub const MAX_QUERY_LEN: usize = 32 * 1024;

/// An indexed batch of queries executed together on one worker.
///
/// Slots are fixed at construction; each carries query text and, after the
/// batch ran, that slot's result. Text may be set at most once per slot, and
/// [`QueryHolder::take_result`] hands the result to the caller while
/// releasing the slot's text, so a holder can be drained slot by slot:
///
/// ```rust
/// use sql_relay::prelude::*;
///
/// let mut holder = QueryHolder::new(2);
/// holder.set_query(0, "SELECT guid FROM characters")?;
/// holder.set_query(1, "SELECT id FROM guilds")?;
/// # Ok::<(), SqlRelayError>(())
/// ```
#[derive(Debug, Default)]
pub struct QueryHolder {
    slots: Vec<(Option<String>, Option<ResultSet>)>,
}

impl QueryHolder {
    /// Create a holder with `size` empty slots.
    #[must_use]
    pub fn new(size: usize) -> Self {
        let mut holder = Self { slots: Vec::new() };
        holder.resize(size);
        holder
    }

    /// Grow or shrink the slot count. Shrinking drops the removed slots'
    /// text and results.
    pub fn resize(&mut self, size: usize) {
        self.slots.resize_with(size, || (None, None));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store query text in a slot.
    ///
    /// # Errors
    /// Rejects an out-of-range index or a slot that already holds text; the
    /// holder is left untouched in both cases.
    pub fn set_query(&mut self, index: usize, sql: impl Into<String>) -> Result<(), SqlRelayError> {
        let sql = sql.into();
        let size = self.slots.len();
        let Some(slot) = self.slots.get_mut(index) else {
            tracing::error!(index, size, query = %sql, "holder query index out of range");
            return Err(SqlRelayError::HolderIndexOutOfRange { index, size });
        };

        if let Some(existing) = &slot.0 {
            tracing::error!(
                index,
                old = %existing,
                new = %sql,
                "attempt to assign query to an occupied holder slot"
            );
            return Err(SqlRelayError::HolderSlotOccupied { index });
        }

        slot.0 = Some(sql);
        Ok(())
    }

    /// Format-and-store variant of [`QueryHolder::set_query`].
    ///
    /// # Errors
    /// Additionally rejects text that renders longer than [`MAX_QUERY_LEN`];
    /// an over-long query is never stored, truncated or otherwise.
    ///
    /// ```rust
    /// use sql_relay::prelude::*;
    ///
    /// let mut holder = QueryHolder::new(1);
    /// holder.set_query_fmt(0, format_args!("SELECT * FROM mail WHERE receiver = {}", 42))?;
    /// # Ok::<(), SqlRelayError>(())
    /// ```
    pub fn set_query_fmt(
        &mut self,
        index: usize,
        args: fmt::Arguments<'_>,
    ) -> Result<(), SqlRelayError> {
        let rendered = args.to_string();
        if rendered.len() > MAX_QUERY_LEN {
            tracing::error!(
                index,
                len = rendered.len(),
                max = MAX_QUERY_LEN,
                "formatted query too long, not stored"
            );
            return Err(SqlRelayError::QueryTooLong {
                len: rendered.len(),
                max: MAX_QUERY_LEN,
            });
        }
        self.set_query(index, rendered)
    }

    /// Take ownership of a slot's result, releasing the slot's query text.
    ///
    /// The first take after execution yields the result (if the query
    /// produced one); any further take yields `None`, as does an
    /// out-of-range index.
    pub fn take_result(&mut self, index: usize) -> Option<ResultSet> {
        let slot = self.slots.get_mut(index)?;
        slot.0 = None;
        slot.1.take()
    }

    /// Reset every slot's result, leaving query text intact. Used to reuse a
    /// holder for another run.
    pub fn clear_results(&mut self) {
        for slot in &mut self.slots {
            slot.1 = None;
        }
    }

    pub(crate) fn query_text(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|slot| slot.0.as_deref())
    }

    pub(crate) fn set_result(&mut self, index: usize, result: Option<ResultSet>) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.1 = result;
        }
    }
}
