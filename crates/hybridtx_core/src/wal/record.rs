//! WAL record types and their line format.

use crate::error::{CoreError, CoreResult};
use hybridtx_protocol::Action;
use std::fmt;

/// The keyword that starts every WAL line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalKeyword {
    /// Transaction start, written by older coordinators.
    Start,
    /// Slow-path intent to contend for keys.
    RaftPropose,
    /// Global commit decision.
    Commit,
    /// Global abort decision.
    Abort,
}

impl WalKeyword {
    /// Returns the keyword as written in the log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::RaftPropose => "RAFT_PROPOSE",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
        }
    }

    /// Parses a keyword.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "START" => Some(Self::Start),
            "RAFT_PROPOSE" => Some(Self::RaftPropose),
            "COMMIT" => Some(Self::Commit),
            "ABORT" => Some(Self::Abort),
            _ => None,
        }
    }
}

impl fmt::Display for WalKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One coordinator lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// A transaction started (legacy record, accepted on read).
    Start {
        /// Transaction ID.
        txn_id: String,
        /// Keys it touches.
        keys: Vec<String>,
    },

    /// A contending transaction intends to take `keys`.
    RaftPropose {
        /// Transaction ID.
        txn_id: String,
        /// Keys it will wait for.
        keys: Vec<String>,
    },

    /// The transaction committed.
    Commit {
        /// Transaction ID.
        txn_id: String,
    },

    /// The transaction aborted.
    Abort {
        /// Transaction ID.
        txn_id: String,
    },
}

impl WalRecord {
    /// Creates a slow-path intent record.
    pub fn raft_propose(txn_id: impl Into<String>, keys: &[String]) -> Self {
        Self::RaftPropose {
            txn_id: txn_id.into(),
            keys: keys.to_vec(),
        }
    }

    /// Creates the decision record for `action`.
    pub fn decision(txn_id: impl Into<String>, action: Action) -> Self {
        let txn_id = txn_id.into();
        match action {
            Action::Commit => Self::Commit { txn_id },
            Action::Abort => Self::Abort { txn_id },
        }
    }

    /// Returns the record keyword.
    #[must_use]
    pub fn keyword(&self) -> WalKeyword {
        match self {
            Self::Start { .. } => WalKeyword::Start,
            Self::RaftPropose { .. } => WalKeyword::RaftPropose,
            Self::Commit { .. } => WalKeyword::Commit,
            Self::Abort { .. } => WalKeyword::Abort,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn txn_id(&self) -> &str {
        match self {
            Self::Start { txn_id, .. }
            | Self::RaftPropose { txn_id, .. }
            | Self::Commit { txn_id }
            | Self::Abort { txn_id } => txn_id,
        }
    }

    /// Returns the keys named by the record (empty for decisions).
    #[must_use]
    pub fn keys(&self) -> &[String] {
        match self {
            Self::Start { keys, .. } | Self::RaftPropose { keys, .. } => keys,
            Self::Commit { .. } | Self::Abort { .. } => &[],
        }
    }

    /// Parses one log line (without its terminator).
    ///
    /// Key lists written as `[a b]` by older coordinators are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WalCorruption`] for an unknown keyword, a missing
    /// transaction id, or keys trailing a decision.
    pub fn parse_line(line: &str, line_no: usize) -> CoreResult<Self> {
        let mut words = line.split_whitespace();

        let keyword = words
            .next()
            .ok_or_else(|| CoreError::wal_corruption(line_no, "empty line"))?;
        let keyword = WalKeyword::parse(keyword).ok_or_else(|| {
            CoreError::wal_corruption(line_no, format!("unknown keyword {keyword:?}"))
        })?;

        let txn_id = words
            .next()
            .ok_or_else(|| CoreError::wal_corruption(line_no, "missing transaction id"))?
            .to_string();

        let keys = parse_keys(words);

        match keyword {
            WalKeyword::Start => Ok(Self::Start { txn_id, keys }),
            WalKeyword::RaftPropose => Ok(Self::RaftPropose { txn_id, keys }),
            WalKeyword::Commit | WalKeyword::Abort if !keys.is_empty() => Err(
                CoreError::wal_corruption(line_no, format!("{keyword} record carries keys")),
            ),
            WalKeyword::Commit => Ok(Self::Commit { txn_id }),
            WalKeyword::Abort => Ok(Self::Abort { txn_id }),
        }
    }
}

fn parse_keys<'a>(words: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut keys: Vec<String> = words.map(str::to_string).collect();

    let bracketed = keys.first().is_some_and(|k| k.starts_with('['))
        && keys.last().is_some_and(|k| k.ends_with(']'));
    if bracketed {
        if let Some(first) = keys.first_mut() {
            first.remove(0);
        }
        if let Some(last) = keys.last_mut() {
            last.pop();
        }
        keys.retain(|k| !k.is_empty());
    }

    keys
}

impl fmt::Display for WalRecord {
    /// Renders the record as a log line, without the terminator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword(), self.txn_id())?;
        for key in self.keys() {
            write!(f, " {key}")?;
        }
        Ok(())
    }
}
