//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// Another process holds the exclusive lock on the file.
    #[error("storage locked by another process: {}", path.display())]
    Locked {
        /// Path of the locked file.
        path: PathBuf,
    },
}

impl StorageError {
    /// Returns true if the error means another owner holds the store.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, StorageError::Locked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_display_names_path() {
        let err = StorageError::Locked {
            path: PathBuf::from("/var/lib/coordinator.log"),
        };
        assert!(err.is_locked());
        assert!(err.to_string().contains("coordinator.log"));
    }

    #[test]
    fn io_errors_convert() {
        let err: StorageError = io::Error::new(io::ErrorKind::Other, "disk gone").into();
        assert!(!err.is_locked());
        assert!(err.to_string().contains("disk gone"));
    }
}
