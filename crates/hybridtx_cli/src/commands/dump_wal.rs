//! Dump WAL command implementation.

use hybridtx_core::WalRecord;
use serde::Serialize;
use std::path::Path;

/// WAL line representation for output.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WalEntryInfo {
    /// 1-based line number in the WAL file.
    pub line: usize,
    /// Record keyword, or `UNPARSABLE`.
    pub keyword: String,
    /// Transaction ID (if the line parsed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_id: Option<String>,
    /// Keys named by the record.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    /// Raw text of a line that did not parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Runs the dump-wal command.
///
/// The file is read directly, without taking the coordinator's lock, so a
/// running coordinator's log can be inspected.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("WAL file not found: {}", path.display()).into());
    }

    let contents = std::fs::read_to_string(path)?;
    let entries = read_wal_entries(&contents, limit);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(&entries);
        }
    }

    Ok(())
}

fn read_wal_entries(contents: &str, limit: Option<usize>) -> Vec<WalEntryInfo> {
    // A final line without its terminator was never acknowledged.
    let complete = match contents.rfind('\n') {
        Some(pos) => &contents[..=pos],
        None => "",
    };

    complete
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .take(limit.unwrap_or(usize::MAX))
        .map(|(idx, line)| match WalRecord::parse_line(line, idx + 1) {
            Ok(record) => WalEntryInfo {
                line: idx + 1,
                keyword: record.keyword().to_string(),
                txn_id: Some(record.txn_id().to_string()),
                keys: record.keys().to_vec(),
                raw: None,
            },
            Err(_) => WalEntryInfo {
                line: idx + 1,
                keyword: "UNPARSABLE".to_string(),
                txn_id: None,
                keys: Vec::new(),
                raw: Some(line.to_string()),
            },
        })
        .collect()
}

fn print_text_output(entries: &[WalEntryInfo]) {
    println!("WAL Records ({} total)", entries.len());
    println!("================");
    println!();

    for entry in entries {
        print!("[{:06}] {:12}", entry.line, entry.keyword);

        if let Some(ref txn_id) = entry.txn_id {
            print!(" txn={txn_id}");
        }
        if !entry.keys.is_empty() {
            print!(" keys={}", entry.keys.join(","));
        }
        if let Some(ref raw) = entry.raw {
            print!(" {raw:?}");
        }

        println!();
    }
}
