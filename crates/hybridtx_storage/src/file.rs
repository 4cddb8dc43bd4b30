//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A durable, single-owner file backend.
///
/// Opening the file takes an exclusive advisory lock on it, so only one
/// coordinator process can append to a given log at a time. The OS drops
/// the lock when the file is closed.
///
/// # Durability
///
/// `append` only hands bytes to the OS. `sync` calls `File::sync_all`, and
/// nothing written is durable until it returns.
///
/// # Example
///
/// ```no_run
/// use hybridtx_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("coordinator.log")).unwrap();
/// backend.append(b"ABORT txn-7\n").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Mutex<File>,
    size: u64,
}

impl FileBackend {
    /// Opens or creates the file at `path` and locks it exclusively.
    ///
    /// Existing contents are preserved; new appends go after them.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another owner holds the file, or an
    /// I/O error if it cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            size,
        })
    }

    /// Like [`FileBackend::open`], creating missing parent directories first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or the file
    /// cannot be opened and locked.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `data` through `write`.
    ///
    /// If `write` fails, the file is cut back to its previous length so a
    /// partial write cannot run into the next append.
    fn append_with<F>(&mut self, data: &[u8], write: F) -> StorageResult<u64>
    where
        F: FnOnce(&mut File, &[u8]) -> std::io::Result<()>,
    {
        let offset = self.size;
        if data.is_empty() {
            return Ok(offset);
        }

        // Opened in append mode: every write lands at the end.
        let file = self.file.get_mut();
        if let Err(err) = write(file, data) {
            file.set_len(self.size)?;
            return Err(err.into());
        }
        self.size += data.len() as u64;
        Ok(offset)
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let end = offset.saturating_add(len as u64);
        if end > self.size {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: self.size,
            });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.append_with(data, |file, data| file.write_all(data))
    }

    fn sync(&mut self) -> StorageResult<()> {
        let file = self.file.get_mut();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if new_size > self.size {
            return Err(StorageError::ReadPastEnd {
                offset: new_size,
                len: 0,
                size: self.size,
            });
        }

        let file = self.file.get_mut();
        file.set_len(new_size)?;
        file.sync_all()?;
        self.size = new_size;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.size)
    }
}
