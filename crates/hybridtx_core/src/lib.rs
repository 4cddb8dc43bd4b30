//! # hybridtx Core
//!
//! Decision engine for the hybridtx two-phase commit coordinator.
//!
//! This crate provides:
//! - A dependency analyzer: the coordinator's key lock table
//! - A write-ahead log for intents and decisions
//! - The transaction manager that routes each request down the fast,
//!   slow or data-blind path and runs two-phase commit
//! - The participant transport seam
//!
//! The HTTP surface lives in `hybridtx_server`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod config;
mod error;
mod stats;
mod transaction;
mod transport;
mod wal;

pub use analyzer::{DependencyAnalyzer, LockMode};
pub use config::{CoordinatorConfig, RoutingPolicy};
pub use error::{CoreError, CoreResult};
pub use stats::{CoordinatorStats, StatsSnapshot};
pub use transaction::{CommitMode, CommitReceipt, TransactionManager, TxnPhase};
pub use transport::{MockTransport, MockVote, ParticipantTransport, Vote};
pub use wal::{WalAudit, WalKeyword, WalManager, WalRecord};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
