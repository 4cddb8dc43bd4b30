//! # hybridtx Protocol
//!
//! Wire messages exchanged between clients, the coordinator and participants.
//!
//! This crate provides:
//! - [`TransactionRequest`], the client's multi-key transaction
//! - [`PrepareRequest`] and [`CommitRequest`], the two 2PC calls a
//!   coordinator makes against each participant
//! - JSON encoding/decoding and request validation
//! - Endpoint path constants shared by servers and clients
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod messages;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{Action, CommitRequest, PrepareRequest, TransactionRequest};

/// Coordinator endpoint accepting [`TransactionRequest`]s.
pub const TXN_PATH: &str = "/txn";

/// Coordinator endpoint reporting counters.
pub const STATS_PATH: &str = "/stats";

/// Participant endpoint accepting [`PrepareRequest`]s.
pub const PREPARE_PATH: &str = "/prepare";

/// Participant endpoint accepting [`CommitRequest`]s.
pub const COMMIT_PATH: &str = "/commit";
