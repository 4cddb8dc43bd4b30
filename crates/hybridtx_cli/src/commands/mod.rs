//! CLI command implementations.

pub mod coordinator;
pub mod dump_wal;
pub mod loadtest;
pub mod participant;
