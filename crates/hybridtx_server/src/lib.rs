//! # hybridtx Server
//!
//! HTTP surface for the hybridtx coordinator.
//!
//! This crate provides:
//! - The coordinator endpoint (`POST /txn`, `GET /stats`)
//! - Participant nodes with their own lock tables (`POST /prepare`,
//!   `POST /commit`)
//! - [`HttpTransport`], the coordinator's HTTP client to participants
//! - Launchers for a coordinator, one participant or a local cluster
//!
//! # Example
//!
//! ```rust,ignore
//! use hybridtx_core::CoordinatorConfig;
//! use hybridtx_server::{serve_coordinator, ServerConfig};
//!
//! serve_coordinator(ServerConfig::default(), CoordinatorConfig::default()).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod coordinator;
mod error;
mod http;
mod participant;
mod server;

pub use config::{ClusterConfig, ParticipantConfig, ServerConfig};
pub use coordinator::coordinator_router;
pub use error::{ServerError, ServerResult};
pub use http::HttpTransport;
pub use participant::{participant_router, ParticipantNode};
pub use server::{serve, serve_cluster, serve_coordinator, serve_participant};
