//! Transaction coordination.
//!
//! Each submitted transaction is routed, locked if needed, run through
//! two-phase commit and released:
//!
//! - **Fast path**: none of its keys is held, so the locks are taken
//!   without waiting and no intent is logged.
//! - **Slow path**: a key is held, so a `RAFT_PROPOSE` intent is made
//!   durable and the transaction waits for its keys.
//! - **Standard 2PC**: routing disabled; straight to prepare.
//!
//! The decision is unanimous: one missing acknowledgment aborts.

mod manager;
mod state;

pub use manager::TransactionManager;
pub use state::{CommitMode, CommitReceipt, TxnPhase};
