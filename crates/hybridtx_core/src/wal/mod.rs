//! Write-ahead log for coordinator decisions.
//!
//! The WAL is an append-only text file, one record per line:
//!
//! ```text
//! RAFT_PROPOSE txn-41 user-7 user-9
//! COMMIT txn-41
//! ABORT txn-42
//! ```
//!
//! ## Ordering contract
//!
//! - A slow-path `RAFT_PROPOSE` intent is durable before the transaction
//!   tries to take its keys.
//! - `COMMIT`/`ABORT` is durable before any participant is told the outcome.
//!
//! [`WalManager::write`] does not return until the backend has synced, so
//! both points hold across a coordinator crash.
//!
//! ## Recovery Policy
//!
//! The log is read at startup for audit only. It is not replayed into lock
//! state: a transaction caught between locking and its decision by a crash
//! has no roll-forward. A torn final line (crash mid-append, never
//! acknowledged) is cut off when the log is opened.
//!
//! ## Invariants
//!
//! - Records are never modified after write
//! - Concurrent writers are totally ordered by a single mutex
//! - Reads observe every record whose write has returned

mod record;
mod writer;

pub use record::{WalKeyword, WalRecord};
pub use writer::{WalAudit, WalManager};
