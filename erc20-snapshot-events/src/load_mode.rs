//! Resolution of where a scan should resume.
//!
//! State is inferred, in priority order, from:
//! 1. the absence of the token's events folder (fresh scan),
//! 2. a `{symbol}-{block}.{csv|json}` balances file left by the aggregation
//!    stage (incremental scan),
//! 3. the token's progress ledger,
//! 4. the highest numbered block file in the events folder.
//!
//! Resolution only reads; nothing is written.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::ledger::Ledger;
use crate::store::{self, BlockFileStore};

/// How the current run relates to earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadMode {
    /// Nothing persisted yet for this token.
    Fresh,
    /// Balances were already computed up to some block.
    Incremental,
    /// Block files exist but balances were never computed.
    InitialLoad,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fresh => "fresh",
            Self::Incremental => "incremental",
            Self::InitialLoad => "initial-load",
        })
    }
}

/// Starting point of a scan run, resolved once and then left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    /// Resolved mode.
    pub mode: LoadMode,
    /// First block to fetch.
    pub scan_from: u64,
    /// Highest block known to be covered already; `None` means nothing is.
    pub last_loaded_block: Option<u64>,
    /// Balances file the state was derived from, in incremental mode.
    pub balances_file: Option<String>,
}

impl ScanState {
    /// State for a token with no prior data, starting at `from_block`.
    #[must_use]
    pub const fn fresh(from_block: u64) -> Self {
        Self {
            mode: LoadMode::Fresh,
            scan_from: from_block,
            last_loaded_block: None,
            balances_file: None,
        }
    }

    /// Whether blocks up to `to_block` still have to be fetched.
    #[must_use]
    pub fn needs_scan(&self, to_block: u64) -> bool {
        self.last_loaded_block.is_none_or(|last| last < to_block)
    }
}

/// Parse the block number out of a balances file name of `symbol`.
///
/// Accepts `{symbol}-{block}`, optionally followed by `.csv` or `.json`.
/// Returns `None` for other tokens' files and for malformed names.
#[must_use]
pub fn parse_balances_file_name(symbol: &str, name: &str) -> Option<u64> {
    let rest = name.strip_prefix(symbol)?.strip_prefix('-')?;
    let stem = rest
        .strip_suffix(".csv")
        .or_else(|| rest.strip_suffix(".json"))
        .unwrap_or(rest);
    stem.parse().ok()
}

/// Decides the [`ScanState`] of a token from what is already on disk.
#[derive(Debug)]
pub struct LoadModeResolver<'a> {
    store: &'a BlockFileStore,
    ledger: &'a Ledger,
    balances_dir: PathBuf,
    from_block: Option<u64>,
}

impl<'a> LoadModeResolver<'a> {
    /// Create a resolver. `from_block` is the configured start of a fresh
    /// scan.
    pub fn new(
        store: &'a BlockFileStore,
        ledger: &'a Ledger,
        balances_dir: impl Into<PathBuf>,
        from_block: Option<u64>,
    ) -> Self {
        Self {
            store,
            ledger,
            balances_dir: balances_dir.into(),
            from_block,
        }
    }

    /// Resolve the scan state of `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the ledger exists but cannot be
    /// read. Malformed file names never fail resolution.
    pub fn resolve(&self, symbol: &str) -> Result<ScanState, StoreError> {
        if !self.store.exists(symbol) {
            let from = self.from_block.unwrap_or(0);
            tracing::info!(
                symbol,
                folder = %self.store.folder(symbol).display(),
                from,
                configured = self.from_block.is_some(),
                "events folder does not exist yet, scanning from scratch"
            );
            return Ok(ScanState::fresh(from));
        }

        if let Some(state) = self.from_balances_file(symbol)? {
            return Ok(state);
        }

        if let Some(entry) = self.ledger.last(symbol)? {
            let scan_from = entry.last_block.saturating_add(1);
            tracing::info!(
                symbol,
                last_block = entry.last_block,
                scan_from,
                "no balances file, resuming from progress ledger"
            );
            return Ok(ScanState {
                mode: LoadMode::InitialLoad,
                scan_from,
                last_loaded_block: Some(entry.last_block),
                balances_file: None,
            });
        }

        self.from_block_files(symbol)
    }

    /// Incremental state from the most recent balances file, if any.
    fn from_balances_file(&self, symbol: &str) -> Result<Option<ScanState>, StoreError> {
        let mut names = store::list_file_names(&self.balances_dir)?;
        names.sort_unstable_by(|a, b| b.cmp(a));
        let prefix = format!("{symbol}-");

        let mut matches = names.iter().filter_map(|name| {
            let block = parse_balances_file_name(symbol, name);
            if block.is_none() && name.starts_with(&prefix) {
                tracing::warn!(symbol, file = %name, "ignoring malformed balances file name");
            }
            block.map(|b| (name, b))
        });

        let Some((name, block)) = matches.next() else {
            return Ok(None);
        };
        let extra = matches.count();
        if extra > 0 {
            tracing::warn!(
                symbol,
                chosen = %name,
                extra,
                "multiple balances files found, using the highest"
            );
        }

        tracing::info!(
            symbol,
            file = %name,
            last_block = block,
            "found balances file, scanning incrementally"
        );
        Ok(Some(ScanState {
            mode: LoadMode::Incremental,
            scan_from: block,
            last_loaded_block: Some(block),
            balances_file: Some(name.clone()),
        }))
    }

    /// Initial-load state from the highest numbered block file.
    fn from_block_files(&self, symbol: &str) -> Result<ScanState, StoreError> {
        let max = self
            .store
            .list_block_files(symbol)?
            .iter()
            .map(|name| store::parse_block_file_name(name))
            .max()
            .unwrap_or(0);

        tracing::info!(
            symbol,
            max_block = max,
            "no balances file, resuming from highest downloaded block"
        );
        Ok(ScanState {
            mode: LoadMode::InitialLoad,
            scan_from: max,
            last_loaded_block: (max > 0).then_some(max),
            balances_file: None,
        })
    }
}
