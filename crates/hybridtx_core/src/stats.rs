//! Coordinator counters.
//!
//! All counters are atomic and can be read while transactions are in flight.

use crate::transaction::CommitMode;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for one coordinator.
#[derive(Debug, Default)]
pub struct CoordinatorStats {
    /// Transactions routed to the fast path.
    fast_path: AtomicU64,
    /// Transactions routed to the slow path.
    slow_path: AtomicU64,
    /// Transactions run as data-blind 2PC.
    standard: AtomicU64,
    /// Transactions committed.
    committed: AtomicU64,
    /// Transactions aborted by a participant vote.
    aborted: AtomicU64,
    /// Fast-path lock conflicts.
    conflicts: AtomicU64,
    /// Slow-path lock timeouts.
    timeouts: AtomicU64,
    /// WAL writes that failed.
    wal_failures: AtomicU64,
}

impl CoordinatorStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_route(&self, mode: CommitMode) {
        let counter = match mode {
            CommitMode::FastPath => &self.fast_path,
            CommitMode::SlowPath => &self.slow_path,
            CommitMode::Standard => &self.standard,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wal_failure(&self) {
        self.wal_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fast_path: self.fast_path.load(Ordering::Relaxed),
            slow_path: self.slow_path.load(Ordering::Relaxed),
            standard: self.standard.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            wal_failures: self.wal_failures.load(Ordering::Relaxed),
        }
    }
}

/// A serializable snapshot of [`CoordinatorStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Transactions routed to the fast path.
    pub fast_path: u64,
    /// Transactions routed to the slow path.
    pub slow_path: u64,
    /// Transactions run as data-blind 2PC.
    pub standard: u64,
    /// Transactions committed.
    pub committed: u64,
    /// Transactions aborted by a participant vote.
    pub aborted: u64,
    /// Fast-path lock conflicts.
    pub conflicts: u64,
    /// Slow-path lock timeouts.
    pub timeouts: u64,
    /// WAL writes that failed.
    pub wal_failures: u64,
}
