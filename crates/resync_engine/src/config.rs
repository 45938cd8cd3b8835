//! Configuration for the sync coordinator.

use std::time::Duration;

/// Configuration for sync cycles and the background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Request-level attempts per task per cycle.
    ///
    /// Kept at 1 by default so a task's `max_attempts` bounds the total
    /// number of transport calls. Raising it multiplies the two budgets.
    pub request_attempts: u32,
    /// Entity groups replayed concurrently.
    pub max_concurrent_groups: usize,
    /// Wake the worker whenever a task is enqueued.
    pub sync_on_enqueue: bool,
    /// Run one cycle when the worker starts.
    pub sync_on_start: bool,
    /// Schedule a follow-up cycle after backoff when tasks are retrying.
    pub auto_retry: bool,
    /// Periodic sync interval for the worker. `None` or zero disables it.
    pub sync_interval: Option<Duration>,
    /// Capacity of the sync event channel.
    pub event_capacity: usize,
}

impl SyncConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_attempts: 1,
            max_concurrent_groups: 1,
            sync_on_enqueue: true,
            sync_on_start: true,
            auto_retry: true,
            sync_interval: Some(Duration::from_secs(300)),
            event_capacity: 64,
        }
    }

    /// Sets the request-level attempts.
    #[must_use]
    pub fn with_request_attempts(mut self, attempts: u32) -> Self {
        self.request_attempts = attempts;
        self
    }

    /// Sets how many entity groups may run at once.
    #[must_use]
    pub fn with_max_concurrent_groups(mut self, groups: usize) -> Self {
        self.max_concurrent_groups = groups;
        self
    }

    /// Sets whether enqueue wakes the worker.
    #[must_use]
    pub fn with_sync_on_enqueue(mut self, enabled: bool) -> Self {
        self.sync_on_enqueue = enabled;
        self
    }

    /// Sets whether the worker syncs at start-up.
    #[must_use]
    pub fn with_sync_on_start(mut self, enabled: bool) -> Self {
        self.sync_on_start = enabled;
        self
    }

    /// Sets whether retrying tasks schedule a follow-up cycle.
    #[must_use]
    pub fn with_auto_retry(mut self, enabled: bool) -> Self {
        self.auto_retry = enabled;
        self
    }

    /// Sets the periodic sync interval; `None` or zero disables it.
    #[must_use]
    pub fn with_sync_interval(mut self, interval: Option<Duration>) -> Self {
        self.sync_interval = interval.filter(|period| !period.is_zero());
        self
    }

    /// Returns the periodic sync interval, if one is enabled.
    #[must_use]
    pub fn periodic_interval(&self) -> Option<Duration> {
        self.sync_interval.filter(|period| !period.is_zero())
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.request_attempts, 1);
        assert_eq!(config.max_concurrent_groups, 1);
        assert!(config.sync_on_enqueue);
        assert!(config.sync_on_start);
        assert!(config.auto_retry);
        assert_eq!(config.sync_interval, Some(Duration::from_secs(300)));
    }

    #[test]
    fn builder() {
        let config = SyncConfig::new()
            .with_request_attempts(3)
            .with_max_concurrent_groups(4)
            .with_sync_on_enqueue(false)
            .with_sync_on_start(false)
            .with_auto_retry(false)
            .with_sync_interval(None)
            .with_event_capacity(8);

        assert_eq!(config.request_attempts, 3);
        assert_eq!(config.max_concurrent_groups, 4);
        assert!(!config.sync_on_enqueue);
        assert!(!config.sync_on_start);
        assert!(!config.auto_retry);
        assert_eq!(config.sync_interval, None);
        assert_eq!(config.event_capacity, 8);
    }

    #[test]
    fn zero_interval_disables_periodic_sync() {
        let config = SyncConfig::new().with_sync_interval(Some(Duration::ZERO));
        assert_eq!(config.sync_interval, None);
        assert_eq!(config.periodic_interval(), None);

        let config = SyncConfig {
            sync_interval: Some(Duration::ZERO),
            ..SyncConfig::default()
        };
        assert_eq!(config.periodic_interval(), None);

        let config = SyncConfig::new().with_sync_interval(Some(Duration::from_secs(60)));
        assert_eq!(config.periodic_interval(), Some(Duration::from_secs(60)));
    }
}
