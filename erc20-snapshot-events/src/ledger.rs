//! Per-token scan progress ledger.
//!
//! Each token has a `<symbol>.jsonl` file in the ledger directory. The
//! scanner appends one line after every batch whose events are fully on
//! disk, so the last line is the highest block up to which the scan is
//! known to be contiguous. Lines are never rewritten.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::load_mode::LoadMode;

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Token the entry belongs to.
    pub symbol: String,
    /// Last block of the batch that was completed.
    pub last_block: u64,
    /// Load mode of the run that completed it.
    pub mode: LoadMode,
    /// Unix timestamp (seconds) when the entry was appended.
    pub recorded_at: u64,
}

impl LedgerEntry {
    /// Create an entry for `last_block` with the current timestamp.
    #[must_use]
    pub fn now(symbol: &str, last_block: u64, mode: LoadMode) -> Self {
        let recorded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            symbol: symbol.to_owned(),
            last_block,
            mode,
            recorded_at,
        }
    }
}

/// Append-only progress store, one file per token.
#[derive(Debug, Clone)]
pub struct Ledger {
    dir: PathBuf,
}

impl Ledger {
    /// Create a ledger rooted at `dir`. Nothing is touched until the first
    /// append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the ledger file for `symbol`.
    #[must_use]
    pub fn path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.jsonl"))
    }

    /// Read the latest entry for `symbol`.
    ///
    /// Returns `None` if there is no ledger yet. Lines that fail to parse
    /// (e.g. a write torn by a crash) are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn last(&self, symbol: &str) -> Result<Option<LedgerEntry>, StoreError> {
        let path = self.path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let data =
            std::fs::read_to_string(&path).map_err(|e| StoreError::io("reading", &path, e))?;

        Ok(data
            .lines()
            .rev()
            .filter(|line| !line.trim().is_empty())
            .find_map(|line| match serde_json::from_str::<LedgerEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping corrupted ledger line"
                    );
                    None
                }
            }))
    }

    /// Append `entry` to its token's ledger and flush it to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the line
    /// cannot be written.
    pub fn append(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io("creating", &self.dir, e))?;

        let path = self.path(&entry.symbol);
        let mut line = serde_json::to_string(entry).map_err(|e| StoreError::json(&path, e))?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io("opening", &path, e))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| StoreError::io("appending to", &path, e))?;
        Ok(())
    }

    /// Drop every entry of `symbol`.
    ///
    /// Called when a token starts over from scratch, so progress recorded
    /// against block files that no longer exist cannot be resumed from.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing ledger file cannot be removed.
    pub fn reset(&self, symbol: &str) -> Result<(), StoreError> {
        let path = self.path(symbol);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(symbol, path = %path.display(), "discarded progress ledger");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("removing", &path, e)),
        }
    }

    /// The directory holding all ledger files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn empty_ledger_has_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("progress"));
        assert!(ledger.last("ABC").unwrap().is_none(), "no file yet");
    }

    #[test]
    fn last_entry_wins() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());
        ledger.append(&LedgerEntry::now("ABC", 100, LoadMode::Fresh)).unwrap();
        ledger.append(&LedgerEntry::now("ABC", 200, LoadMode::Fresh)).unwrap();
        ledger.append(&LedgerEntry::now("XYZ", 999, LoadMode::Fresh)).unwrap();

        let last = ledger.last("ABC").unwrap().unwrap();
        assert_eq!(last.last_block, 200, "latest ABC entry");
        assert_eq!(last.mode, LoadMode::Fresh, "mode recorded");

        let lines = std::fs::read_to_string(ledger.path("ABC")).unwrap();
        assert_eq!(lines.lines().count(), 2, "append-only");
    }

    #[test]
    fn reset_only_touches_one_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());
        ledger.reset("ABC").unwrap();
        ledger.append(&LedgerEntry::now("ABC", 100, LoadMode::Fresh)).unwrap();
        ledger.append(&LedgerEntry::now("XYZ", 999, LoadMode::Fresh)).unwrap();

        ledger.reset("ABC").unwrap();

        assert!(ledger.last("ABC").unwrap().is_none(), "entries dropped");
        assert_eq!(ledger.last("XYZ").unwrap().unwrap().last_block, 999, "other token kept");
    }

    #[test]
    fn torn_trailing_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path());
        ledger.append(&LedgerEntry::now("ABC", 50, LoadMode::InitialLoad)).unwrap();

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(ledger.path("ABC"))
            .unwrap();
        file.write_all(br#"{"symbol":"ABC","last_bl"#).unwrap();

        let last = ledger.last("ABC").unwrap().unwrap();
        assert_eq!(last.last_block, 50, "falls back to last good line");
    }
}
