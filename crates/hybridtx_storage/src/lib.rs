//! # hybridtx Storage
//!
//! Append-only storage backends for the coordinator's write-ahead log.
//!
//! Backends are **opaque byte stores**: they append, read back and force data
//! to stable storage. They know nothing about WAL records; the line format is
//! owned by `hybridtx_core`.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - durable file, exclusively locked by one process
//! - [`InMemoryBackend`] - for tests; clones share the same bytes so a test
//!   can "reopen" a store after dropping its writer
//!
//! ## Example
//!
//! ```rust
//! use hybridtx_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"COMMIT txn-1\n").unwrap();
//! backend.sync().unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"COMMIT txn-1\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
