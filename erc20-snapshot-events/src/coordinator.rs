//! Top-level entry point tying metadata, resume state, scanning and the
//! final read-back together.

use std::collections::BTreeSet;

use alloy::primitives::Address;
use erc20_snapshot::TransferEvent;
use serde::Serialize;

use crate::config::{Config, ToBlock};
use crate::error::{ScanError, ScanResult};
use crate::ledger::Ledger;
use crate::load_mode::{LoadMode, LoadModeResolver, ScanState};
use crate::scanner::{BatchScanner, ScanSummary};
use crate::source::EventSource;
use crate::store::BlockFileStore;

/// Everything the aggregation stage needs from a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutput {
    /// Token name.
    pub name: String,
    /// Token symbol.
    pub symbol: String,
    /// Token decimals.
    pub decimals: u8,
    /// First block of this run's scan.
    pub from_block: u64,
    /// Last block of this run's scan.
    pub to_block: u64,
    /// Every persisted event of the token, ordered by block.
    pub events: Vec<TransferEvent>,
    /// Addresses seen in newly scanned blocks (incremental mode only).
    pub new_addresses: BTreeSet<Address>,
    /// Resume state the run started from.
    pub load_mode: ScanState,
    /// Totals of the scan itself.
    #[serde(skip)]
    pub summary: ScanSummary,
}

/// Reject symbols that would escape or alias the per-token folders.
///
/// # Errors
///
/// Returns [`ScanError::InvalidSymbol`] for empty names, `.`/`..` and names
/// containing path separators.
pub fn check_symbol(symbol: &str) -> ScanResult<()> {
    let bad = symbol.is_empty()
        || symbol == "."
        || symbol == ".."
        || symbol.contains(['/', '\\', '\0']);
    if bad {
        return Err(ScanError::InvalidSymbol(symbol.to_owned()));
    }
    Ok(())
}

/// Scan the token behind `source` up to the configured target block and
/// return all of its persisted events.
///
/// # Errors
///
/// Returns an error if metadata or chain height cannot be fetched, the
/// symbol is unusable as a folder name, local state cannot be read or
/// written, or the scan fails (see [`BatchScanner::run`]).
pub async fn get_events<S: EventSource>(source: &S, config: &Config) -> ScanResult<ScanOutput> {
    let meta = source.token_metadata().await?;
    check_symbol(&meta.symbol)?;
    let symbol = meta.symbol.as_str();

    let to_block = match config.to_block {
        ToBlock::Latest => source.block_number().await?,
        ToBlock::Number(n) => n,
    };

    let store = BlockFileStore::new(config.events_dir.as_str());
    let ledger = Ledger::new(&config.ledger_dir);

    let state = LoadModeResolver::new(&store, &ledger, &config.balances_dir, config.from_block)
        .resolve(symbol)?;
    tracing::info!(
        symbol,
        name = %meta.name,
        mode = %state.mode,
        from = state.scan_from,
        to = to_block,
        "resolved scan range"
    );

    // A fresh start has no block files behind any recorded progress.
    if state.mode == LoadMode::Fresh {
        ledger.reset(symbol)?;
    }

    let summary = BatchScanner::new(source, &store, &ledger, symbol)
        .with_blocks_per_batch(config.blocks_per_batch)
        .with_delay(config.batch_delay())
        .run(&state, to_block)
        .await?;

    let contents = store.read_all(symbol, &state)?;

    Ok(ScanOutput {
        from_block: state.scan_from,
        to_block,
        events: contents.events,
        new_addresses: contents.new_addresses,
        load_mode: state,
        summary,
        name: meta.name,
        symbol: meta.symbol,
        decimals: meta.decimals,
    })
}
