//! Transaction routing classes and lifecycle phases.

use serde::Serialize;
use std::fmt;

/// How a transaction was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommitMode {
    /// Keys were free: locked without waiting, no intent record.
    #[serde(rename = "FAST_PATH")]
    FastPath,
    /// Keys were contended: intent logged, then waited for the locks.
    #[serde(rename = "SLOW_PATH")]
    SlowPath,
    /// Data-blind 2PC: no analysis and no coordinator locks.
    #[serde(rename = "STANDARD_2PC")]
    Standard,
}

impl CommitMode {
    /// Returns the label used in logs and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FastPath => "FAST_PATH",
            Self::SlowPath => "SLOW_PATH",
            Self::Standard => "STANDARD_2PC",
        }
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of an in-flight transaction.
///
/// Phases only move forward. `LoggedIntent` is skipped off the slow path and
/// `Locked` is skipped under data-blind routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TxnPhase {
    /// Accepted and registered.
    Received,
    /// Routed to a commit mode.
    Classified,
    /// Slow-path intent record is durable.
    LoggedIntent,
    /// Coordinator locks are held.
    Locked,
    /// Prepare calls are outstanding.
    Preparing,
    /// COMMIT is logged and being broadcast.
    Committed,
    /// ABORT is logged and being broadcast.
    Aborted,
    /// Locks are being dropped.
    Released,
}

/// Returned for a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReceipt {
    /// The committed transaction.
    pub txn_id: String,
    /// Routing class it ran under.
    pub mode: CommitMode,
    /// Number of participants that prepared.
    pub participants: usize,
}

impl fmt::Display for CommitReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SUCCESS [{}]: Transaction {} Committed across {} nodes",
            self.mode, self.txn_id, self.participants
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_labels() {
        assert_eq!(CommitMode::FastPath.to_string(), "FAST_PATH");
        assert_eq!(CommitMode::SlowPath.to_string(), "SLOW_PATH");
        assert_eq!(CommitMode::Standard.to_string(), "STANDARD_2PC");
    }

    #[test]
    fn phases_are_ordered() {
        assert!(TxnPhase::Received < TxnPhase::Classified);
        assert!(TxnPhase::Locked < TxnPhase::Preparing);
        assert!(TxnPhase::Committed < TxnPhase::Released);
    }

    #[test]
    fn receipt_message() {
        let receipt = CommitReceipt {
            txn_id: "txn-3".into(),
            mode: CommitMode::FastPath,
            participants: 2,
        };
        assert_eq!(
            receipt.to_string(),
            "SUCCESS [FAST_PATH]: Transaction txn-3 Committed across 2 nodes"
        );
    }
}
