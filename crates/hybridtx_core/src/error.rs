//! Error types for the coordinator core.

use crate::transaction::CommitMode;
use std::time::Duration;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in coordinator core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] hybridtx_storage::StorageError),

    /// The client request could not be decoded or failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] hybridtx_protocol::ProtocolError),

    /// A WAL line could not be parsed.
    #[error("WAL corruption at line {line}: {message}")]
    WalCorruption {
        /// 1-based line number.
        line: usize,
        /// Description of the corruption.
        message: String,
    },

    /// Fast path: another transaction holds at least one of the keys.
    #[error("transaction {txn_id} conflicts with an active transaction")]
    Conflict {
        /// The rejected transaction.
        txn_id: String,
    },

    /// A transaction with the same id is already being coordinated.
    #[error("transaction {txn_id} is already in flight")]
    AlreadyInFlight {
        /// The duplicated transaction id.
        txn_id: String,
    },

    /// Slow path: the keys did not become free before the deadline.
    #[error("transaction {txn_id} timed out after {waited:?} waiting for locks")]
    LockTimeout {
        /// The rejected transaction.
        txn_id: String,
        /// How long the coordinator waited.
        waited: Duration,
    },

    /// At least one participant did not acknowledge prepare.
    #[error("transaction {txn_id} aborted [{mode}]: {acks}/{participants} participants prepared")]
    TransactionAborted {
        /// The aborted transaction.
        txn_id: String,
        /// Routing class it ran under.
        mode: CommitMode,
        /// Participants that acknowledged prepare.
        acks: usize,
        /// Participants asked.
        participants: usize,
    },

    /// A call to a participant failed below the protocol level.
    #[error("transport error talking to {participant}: {message}")]
    Transport {
        /// Participant address.
        participant: String,
        /// Error message.
        message: String,
    },

    /// A background task failed.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a WAL corruption error.
    pub fn wal_corruption(line: usize, message: impl Into<String>) -> Self {
        Self::WalCorruption {
            line,
            message: message.into(),
        }
    }

    /// Creates a fast-path conflict error.
    pub fn conflict(txn_id: impl Into<String>) -> Self {
        Self::Conflict {
            txn_id: txn_id.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(participant: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            participant: participant.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the transaction was refused because its keys were
    /// unavailable (fast-path conflict, slow-path timeout or duplicate id).
    #[must_use]
    pub fn is_lock_unavailable(&self) -> bool {
        matches!(
            self,
            CoreError::Conflict { .. }
                | CoreError::LockTimeout { .. }
                | CoreError::AlreadyInFlight { .. }
        )
    }
}
