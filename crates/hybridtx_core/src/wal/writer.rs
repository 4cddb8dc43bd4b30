//! WAL writer and reader.

use crate::error::{CoreError, CoreResult};
use crate::wal::record::{WalKeyword, WalRecord};
use hybridtx_storage::{FileBackend, StorageBackend};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;

/// Manages WAL writes and reads.
///
/// Every write appends one newline-terminated line and syncs the backend
/// before returning. Writers are serialized by a single mutex, so lines
/// never interleave and the file order is the order in which writes
/// returned.
pub struct WalManager {
    /// Storage backend for WAL data.
    backend: Mutex<Box<dyn StorageBackend>>,
}

impl WalManager {
    /// Creates a WAL manager over `backend`.
    ///
    /// If the backend ends in a partial line (a write that crashed before
    /// its terminator reached disk), the partial line is cut off so the next
    /// append starts on a fresh line.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing contents cannot be read or truncated.
    pub fn new(mut backend: Box<dyn StorageBackend>) -> CoreResult<Self> {
        let data = backend.read_all()?;
        if !data.is_empty() && !data.ends_with(b"\n") {
            let keep = data
                .iter()
                .rposition(|b| *b == b'\n')
                .map_or(0, |pos| pos + 1);
            tracing::warn!(
                dropped_bytes = data.len() - keep,
                "WAL ends in a partial line; truncating"
            );
            backend.truncate(keep as u64)?;
        }

        Ok(Self {
            backend: Mutex::new(backend),
        })
    }

    /// Opens (or creates) a file-backed WAL at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is held by another
    /// process, or cannot be repaired.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let backend = FileBackend::open_with_create_dirs(path)?;
        Self::new(Box::new(backend))
    }

    /// Appends `record` and waits until it is durable.
    ///
    /// Returns the offset where the line starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the append or the sync fails. The record must
    /// then be treated as not written.
    pub fn write(&self, record: &WalRecord) -> CoreResult<u64> {
        self.write_line(&record.to_string())
    }

    /// Appends a raw entry as one durable line.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WalCorruption`] if `entry` contains a line
    /// break, or a storage error if the append or sync fails.
    pub fn write_line(&self, entry: &str) -> CoreResult<u64> {
        if entry.contains(['\n', '\r']) {
            return Err(CoreError::wal_corruption(0, "entry contains a line break"));
        }

        let mut data = Vec::with_capacity(entry.len() + 1);
        data.extend_from_slice(entry.as_bytes());
        data.push(b'\n');

        let mut backend = self.backend.lock();
        let offset = backend.append(&data)?;
        backend.sync()?;
        Ok(offset)
    }

    /// Returns every line in the log, in file order, without terminators.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn read_all(&self) -> CoreResult<Vec<String>> {
        let data = self.backend.lock().read_all()?;
        Ok(String::from_utf8_lossy(&data)
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Parses every non-empty line into a [`WalRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WalCorruption`] naming the first bad line.
    pub fn records(&self) -> CoreResult<Vec<WalRecord>> {
        self.read_all()?
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| WalRecord::parse_line(line, idx + 1))
            .collect()
    }

    /// Counts the records in the log by keyword.
    ///
    /// Unlike [`WalManager::records`], unparsable lines are counted rather
    /// than reported as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn audit(&self) -> CoreResult<WalAudit> {
        let mut audit = WalAudit::default();
        for (idx, line) in self.read_all()?.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            audit.entries += 1;
            match WalRecord::parse_line(line, idx + 1) {
                Ok(record) => match record.keyword() {
                    WalKeyword::Start => audit.starts += 1,
                    WalKeyword::RaftPropose => audit.intents += 1,
                    WalKeyword::Commit => audit.commits += 1,
                    WalKeyword::Abort => audit.aborts += 1,
                },
                Err(_) => audit.unparsable += 1,
            }
        }
        Ok(audit)
    }

    /// Returns the current WAL size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }
}

impl std::fmt::Debug for WalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalManager").finish_non_exhaustive()
    }
}

/// Per-keyword record counts from a startup scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WalAudit {
    /// Non-empty lines.
    pub entries: usize,
    /// `START` records.
    pub starts: usize,
    /// `RAFT_PROPOSE` records.
    pub intents: usize,
    /// `COMMIT` records.
    pub commits: usize,
    /// `ABORT` records.
    pub aborts: usize,
    /// Lines that did not parse.
    pub unparsable: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridtx_protocol::Action;
    use hybridtx_storage::InMemoryBackend;
    use std::sync::Arc;

    fn create_wal() -> (WalManager, InMemoryBackend) {
        let backend = InMemoryBackend::new();
        let wal = WalManager::new(Box::new(backend.clone())).unwrap();
        (wal, backend)
    }

    fn keys(ks: &[&str]) -> Vec<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn write_then_read_all() {
        let (wal, backend) = create_wal();
        wal.write(&WalRecord::raft_propose("t1", &keys(&["HOT_KEY"])))
            .unwrap();
        wal.write(&WalRecord::decision("t1", Action::Commit)).unwrap();

        assert_eq!(
            wal.read_all().unwrap(),
            vec!["RAFT_PROPOSE t1 HOT_KEY", "COMMIT t1"]
        );
        assert_eq!(backend.data(), b"RAFT_PROPOSE t1 HOT_KEY\nCOMMIT t1\n");
    }

    #[test]
    fn read_empty_wal() {
        let (wal, _) = create_wal();
        assert!(wal.read_all().unwrap().is_empty());
        assert!(wal.records().unwrap().is_empty());
        assert_eq!(wal.size().unwrap(), 0);
    }

    #[test]
    fn offsets_follow_line_lengths() {
        let (wal, _) = create_wal();
        assert_eq!(wal.write(&WalRecord::decision("a", Action::Commit)).unwrap(), 0);
        assert_eq!(wal.write(&WalRecord::decision("b", Action::Abort)).unwrap(), 9);
        assert_eq!(wal.size().unwrap(), 17);
    }

    #[test]
    fn line_breaks_are_refused() {
        let (wal, _) = create_wal();
        assert!(wal.write_line("COMMIT a\nABORT b").is_err());
        assert_eq!(wal.size().unwrap(), 0);
    }

    #[test]
    fn failed_sync_is_reported() {
        let (wal, backend) = create_wal();
        backend.set_failing(true);
        let err = wal
            .write(&WalRecord::decision("t1", Action::Commit))
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[test]
    fn torn_tail_is_dropped_on_open() {
        let backend = InMemoryBackend::with_data(b"COMMIT t1\nABORT t".to_vec());
        let wal = WalManager::new(Box::new(backend.clone())).unwrap();

        assert_eq!(wal.read_all().unwrap(), vec!["COMMIT t1"]);
        wal.write(&WalRecord::decision("t2", Action::Abort)).unwrap();
        assert_eq!(backend.data(), b"COMMIT t1\nABORT t2\n");
    }

    #[test]
    fn torn_single_line_leaves_empty_log() {
        let backend = InMemoryBackend::with_data(b"RAFT_PRO".to_vec());
        let wal = WalManager::new(Box::new(backend)).unwrap();
        assert_eq!(wal.size().unwrap(), 0);
    }

    #[test]
    fn records_report_bad_line_number() {
        let backend = InMemoryBackend::with_data(b"COMMIT t1\n\nGARBAGE t2\n".to_vec());
        let wal = WalManager::new(Box::new(backend)).unwrap();

        match wal.records() {
            Err(CoreError::WalCorruption { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn audit_counts_by_keyword() {
        let backend = InMemoryBackend::with_data(
            b"START t0 a\nRAFT_PROPOSE t1 a\nCOMMIT t1\nABORT t2\nnoise\n".to_vec(),
        );
        let wal = WalManager::new(Box::new(backend)).unwrap();

        assert_eq!(
            wal.audit().unwrap(),
            WalAudit {
                entries: 5,
                starts: 1,
                intents: 1,
                commits: 1,
                aborts: 1,
                unparsable: 1,
            }
        );
    }

    #[test]
    fn concurrent_writers_do_not_interleave() {
        let (wal, _) = create_wal();
        let wal = Arc::new(wal);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let wal = Arc::clone(&wal);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        wal.write(&WalRecord::decision(format!("t{t}-{i}"), Action::Commit))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = wal.records().unwrap();
        assert_eq!(records.len(), 400);
        assert!(records
            .iter()
            .all(|r| r.keyword() == WalKeyword::Commit));
    }

    #[test]
    fn file_backed_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coordinator.log");

        {
            let wal = WalManager::open(&path).unwrap();
            wal.write(&WalRecord::raft_propose("t1", &keys(&["k"])))
                .unwrap();
            wal.write(&WalRecord::decision("t1", Action::Abort)).unwrap();
        }

        let wal = WalManager::open(&path).unwrap();
        assert_eq!(
            wal.records().unwrap(),
            vec![
                WalRecord::raft_propose("t1", &keys(&["k"])),
                WalRecord::decision("t1", Action::Abort),
            ]
        );
    }
}
