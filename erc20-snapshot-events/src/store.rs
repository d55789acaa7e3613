//! Per-block JSON file storage for transfer events.
//!
//! Each token gets its own folder; each block that produced at least one
//! event gets one file named after the block number:
//!
//! ```text
//! tx/<symbol>/
//!   ├── 4634748.json
//!   ├── 4634790.json
//!   └── ...
//! ```
//!
//! Writes are atomic (temp file + rename) and overwrite any previous file
//! for the same block, so replaying a batch is idempotent.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use erc20_snapshot::TransferEvent;

use crate::config::TOKEN_PLACEHOLDER;
use crate::error::StoreError;
use crate::load_mode::{LoadMode, ScanState};

const BLOCK_FILE_EXT: &str = "json";
const TMP_SUFFIX: &str = ".tmp";

/// Partition `events` by block number.
///
/// Blocks come out in ascending order; events within a block keep the order
/// they were received in.
#[must_use]
pub fn group_by_block(events: Vec<TransferEvent>) -> BTreeMap<u64, Vec<TransferEvent>> {
    let mut groups: BTreeMap<u64, Vec<TransferEvent>> = BTreeMap::new();
    for event in events {
        groups.entry(event.block_number).or_default().push(event);
    }
    groups
}

/// Block number of a `<digits>.json` file name, `None` for anything else.
fn block_of(name: &str) -> Option<u64> {
    name.strip_suffix(BLOCK_FILE_EXT)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// Parse a block file name into its block number.
///
/// Anything that is not `<digits>.json` yields `0`, the conservative choice
/// for resume detection: it may cause low blocks to be rescanned but never
/// skips any. Only names that parse here are read back by
/// [`BlockFileStore::read_all`].
#[must_use]
pub fn parse_block_file_name(name: &str) -> u64 {
    block_of(name).unwrap_or_else(|| {
        tracing::debug!(file = name, "unparseable block file name, treating as block 0");
        0
    })
}

/// Events read back from a token's block files.
#[derive(Debug, Clone, Default)]
pub struct BlockFileContents {
    /// All persisted events, ordered by block.
    pub events: Vec<TransferEvent>,
    /// Addresses touched by newly scanned blocks (incremental mode only).
    pub new_addresses: BTreeSet<Address>,
}

/// File-backed mapping from `(symbol, block number)` to that block's events.
#[derive(Debug, Clone)]
pub struct BlockFileStore {
    template: String,
}

impl BlockFileStore {
    /// Create a store rooted at `template`, where `{token}` is replaced by
    /// the token symbol (e.g. `tx/{token}`).
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Folder holding the block files of `symbol`.
    #[must_use]
    pub fn folder(&self, symbol: &str) -> PathBuf {
        PathBuf::from(self.template.replace(TOKEN_PLACEHOLDER, symbol))
    }

    /// Path of the file for `block` of `symbol`.
    #[must_use]
    pub fn block_path(&self, symbol: &str, block: u64) -> PathBuf {
        self.folder(symbol).join(format!("{block}.{BLOCK_FILE_EXT}"))
    }

    /// Whether any state exists for `symbol`.
    #[must_use]
    pub fn exists(&self, symbol: &str) -> bool {
        self.folder(symbol).is_dir()
    }

    /// Names of all block files of `symbol`, in directory order.
    ///
    /// In-flight temp files are skipped. A missing folder yields an empty
    /// list.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder exists but cannot be listed.
    pub fn list_block_files(&self, symbol: &str) -> Result<Vec<String>, StoreError> {
        list_file_names(&self.folder(symbol)).map(|names| {
            names
                .into_iter()
                .filter(|n| !n.ends_with(TMP_SUFFIX))
                .collect()
        })
    }

    /// Persist the events of one block, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder or file cannot be written.
    pub fn write(
        &self,
        symbol: &str,
        block: u64,
        events: &[TransferEvent],
    ) -> Result<PathBuf, StoreError> {
        let path = self.block_path(symbol, block);
        write_json_atomic(&path, events)?;
        Ok(path)
    }

    /// Read the events of a single block, if its file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn read(&self, symbol: &str, block: u64) -> Result<Option<Vec<TransferEvent>>, StoreError> {
        let path = self.block_path(symbol, block);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Read every block file of `symbol` in ascending block order.
    ///
    /// In [`LoadMode::Incremental`] the `from`/`to` addresses of events in
    /// blocks at or after `state.scan_from` are also collected, so the
    /// aggregation stage can refresh only those balances.
    ///
    /// # Errors
    ///
    /// Returns an error if a block file cannot be read or decoded.
    pub fn read_all(
        &self,
        symbol: &str,
        state: &ScanState,
    ) -> Result<BlockFileContents, StoreError> {
        let folder = self.folder(symbol);
        let mut blocks: Vec<(u64, PathBuf)> = self
            .list_block_files(symbol)?
            .into_iter()
            .filter_map(|name| match block_of(&name) {
                Some(block) => Some((block, folder.join(&name))),
                None => {
                    tracing::warn!(symbol, file = %name, "ignoring non-block file");
                    None
                }
            })
            .collect();
        blocks.sort_unstable_by_key(|(block, _)| *block);

        let collect_addresses = state.mode == LoadMode::Incremental;
        let mut contents = BlockFileContents::default();
        for (block, path) in blocks {
            let events: Vec<TransferEvent> = read_json(&path)?;
            if collect_addresses && block >= state.scan_from {
                for event in &events {
                    contents.new_addresses.insert(event.from);
                    contents.new_addresses.insert(event.to);
                }
            }
            contents.events.extend(events);
        }

        tracing::info!(
            symbol,
            events = contents.events.len(),
            new_addresses = contents.new_addresses.len(),
            "loaded block files"
        );
        Ok(contents)
    }
}

/// List the file names in `dir`; a missing directory is treated as empty.
pub(crate) fn list_file_names(dir: &Path) -> Result<Vec<String>, StoreError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| StoreError::io("listing", dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io("listing", dir, e))?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let data = std::fs::read(path).map_err(|e| StoreError::io("reading", path, e))?;
    serde_json::from_slice(&data).map_err(|e| StoreError::json(path, e))
}

/// Write `value` as JSON to `path` via a temp file and rename.
fn write_json_atomic<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io("creating", parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    let tmp = PathBuf::from(tmp);

    let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(path, e))?;
    std::fs::write(&tmp, json).map_err(|e| StoreError::io("writing", &tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::io("renaming", &tmp, e))?;
    Ok(())
}
