use std::time::Duration;

use serde::Deserialize;

/// Tuning knobs for workers and result queues.
///
/// All fields have defaults, so a config file only needs the keys it wants
/// to change:
/// ```rust
/// use sql_relay::prelude::*;
///
/// let config: RelayConfig = serde_json::from_str(r#"{ "ping_interval_ms": 60000 }"#).unwrap();
/// assert_eq!(config.poll_interval_ms, 10);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// How often a worker wakes to drain its queues, in milliseconds.
    pub poll_interval_ms: u64,
    /// How often a worker pings its connection, in milliseconds. Rounded to
    /// a whole number of poll cycles.
    pub ping_interval_ms: u64,
    /// Concurrency bound for pooled delivery of thread-safe callbacks.
    pub callback_pool_size: usize,
    /// Backlog size of pending thread-unsafe callbacks above which
    /// [`crate::ResultQueue::update`] logs a performance warning.
    pub unsafe_backlog_warn_threshold: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            ping_interval_ms: 30_000,
            callback_pool_size: 6,
            unsafe_backlog_warn_threshold: 1000,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn with_ping_interval_ms(mut self, ms: u64) -> Self {
        self.ping_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn with_callback_pool_size(mut self, size: usize) -> Self {
        self.callback_pool_size = size;
        self
    }

    #[must_use]
    pub fn with_unsafe_backlog_warn_threshold(mut self, threshold: usize) -> Self {
        self.unsafe_backlog_warn_threshold = threshold;
        self
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Ping cadence in poll cycles.
    pub(crate) fn ping_every_loops(&self) -> u64 {
        (self.ping_interval_ms / self.poll_interval_ms.max(1)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_cadence_is_derived_from_poll_interval() {
        let config = RelayConfig::default()
            .with_poll_interval_ms(10)
            .with_ping_interval_ms(50);
        assert_eq!(config.ping_every_loops(), 5);
    }

    #[test]
    fn degenerate_intervals_stay_positive() {
        let config = RelayConfig::default()
            .with_poll_interval_ms(0)
            .with_ping_interval_ms(0);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.ping_every_loops(), 1);
    }
}
