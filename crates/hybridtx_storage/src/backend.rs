//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte store backing the write-ahead log.
///
/// # Invariants
///
/// - `append` writes at the current end and returns the offset it wrote at
/// - bytes are never rewritten once appended
/// - after `sync` returns `Ok`, every appended byte survives a process crash
/// - backends must be `Send + Sync`; callers serialize writers themselves
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range extends past
    /// the current size, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the store, returning its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Forces every appended byte to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the device does not confirm durability.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the store back to `new_size` bytes and makes the cut durable.
    ///
    /// Only used to drop a torn tail left by a crash mid-append.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` exceeds the current size or the
    /// truncation fails.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Returns the current size in bytes (the offset of the next append).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Reads the whole store from offset zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the size or the contents cannot be read.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("store of {size} bytes does not fit in memory"),
            )
        })?;
        self.read_at(0, len)
    }
}
