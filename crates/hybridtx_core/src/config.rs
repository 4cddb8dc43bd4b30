//! Coordinator configuration.

use std::path::PathBuf;
use std::time::Duration;

/// How the coordinator routes transactions before 2PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingPolicy {
    /// Classify by key overlap: independent transactions take the fast path,
    /// contending ones log an intent and wait for their keys.
    #[default]
    Hybrid,
    /// Data-blind 2PC: no dependency analysis, no coordinator locks.
    Standard,
}

/// Configuration for a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Path of the write-ahead log file.
    pub wal_path: PathBuf,

    /// Routing policy.
    pub routing: RoutingPolicy,

    /// How often a waiting slow-path transaction re-checks its keys when no
    /// release wakes it first.
    pub lock_poll_interval: Duration,

    /// How long a slow-path transaction may wait for its keys in total.
    pub lock_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            wal_path: PathBuf::from("coordinator.log"),
            routing: RoutingPolicy::Hybrid,
            lock_poll_interval: Duration::from_millis(50),
            lock_timeout: Duration::from_secs(10),
        }
    }
}

impl CoordinatorConfig {
    /// Creates a configuration logging to `wal_path` with default timings.
    #[must_use]
    pub fn new(wal_path: impl Into<PathBuf>) -> Self {
        Self {
            wal_path: wal_path.into(),
            ..Self::default()
        }
    }

    /// Sets the routing policy.
    #[must_use]
    pub fn with_routing(mut self, routing: RoutingPolicy) -> Self {
        self.routing = routing;
        self
    }

    /// Sets the slow-path poll interval.
    #[must_use]
    pub fn with_lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    /// Sets the slow-path lock timeout.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}
