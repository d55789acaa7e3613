//! Batched, resumable scanning of a block range.
//!
//! The range `[scan_from, to_block]` is walked in strictly increasing,
//! sequential batches. Each batch is fetched with a single range query,
//! grouped by block and flushed to disk before the next batch starts, so
//! at most one batch worth of events is held in memory. If the range query
//! fails remotely, the same range is re-fetched one block at a time; a
//! failure at that granularity ends the run.
//!
//! Sequential execution keeps the invariant the resume logic relies on:
//! when a block file exists, every earlier block of the same contiguous
//! scan has been handled.

use std::ops::RangeInclusive;
use std::time::Duration;

use erc20_snapshot::TransferEvent;

use crate::error::ScanResult;
use crate::ledger::{Ledger, LedgerEntry};
use crate::load_mode::ScanState;
use crate::source::EventSource;
use crate::store::{self, BlockFileStore};

/// Iterator over the inclusive batch ranges covering `[start, to_block]`.
///
/// Each batch ends at `start + blocks_per_batch` (capped at `to_block`) and
/// the next starts right after it. A `blocks_per_batch` of `0` yields one
/// batch covering the whole range. Nothing is yielded when
/// `start > to_block`.
#[derive(Debug, Clone)]
pub struct BatchRanges {
    next_start: Option<u64>,
    to_block: u64,
    blocks_per_batch: u64,
}

impl BatchRanges {
    /// Create the iterator.
    #[must_use]
    pub const fn new(start: u64, to_block: u64, blocks_per_batch: u64) -> Self {
        Self {
            next_start: if start > to_block { None } else { Some(start) },
            to_block,
            blocks_per_batch,
        }
    }
}

impl Iterator for BatchRanges {
    type Item = RangeInclusive<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start?;
        let end = if self.blocks_per_batch == 0 {
            self.to_block
        } else {
            start.saturating_add(self.blocks_per_batch).min(self.to_block)
        };
        self.next_start = (end < self.to_block).then(|| end + 1);
        Some(start..=end)
    }
}

/// Totals of a scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Batches processed.
    pub batches: u64,
    /// Batches that had to fall back to block-by-block fetching.
    pub fallbacks: u64,
    /// Block files written.
    pub blocks_written: u64,
    /// Events persisted.
    pub events: u64,
}

impl ScanSummary {
    fn add_persisted(&mut self, (blocks, events): (u64, u64)) {
        self.blocks_written += blocks;
        self.events += events;
    }
}

/// Drives a scan of one token to completion.
#[derive(Debug)]
pub struct BatchScanner<'a, S> {
    source: &'a S,
    store: &'a BlockFileStore,
    ledger: &'a Ledger,
    symbol: &'a str,
    blocks_per_batch: u64,
    delay: Duration,
}

impl<'a, S: EventSource> BatchScanner<'a, S> {
    /// Create a scanner for `symbol` with no batching and no delay.
    pub const fn new(
        source: &'a S,
        store: &'a BlockFileStore,
        ledger: &'a Ledger,
        symbol: &'a str,
    ) -> Self {
        Self {
            source,
            store,
            ledger,
            symbol,
            blocks_per_batch: 0,
            delay: Duration::ZERO,
        }
    }

    /// Set the batch width (`0` = one batch for the whole range).
    #[must_use]
    pub const fn with_blocks_per_batch(mut self, blocks_per_batch: u64) -> Self {
        self.blocks_per_batch = blocks_per_batch;
        self
    }

    /// Set the pause between consecutive batches.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Scan `[state.scan_from, to_block]`.
    ///
    /// Does nothing when `state` already covers `to_block`.
    ///
    /// # Errors
    ///
    /// Returns an error if a block fails during block-by-block fallback, if
    /// the source reports a non-remote error, or if results cannot be
    /// persisted. Blocks flushed before the error remain on disk.
    pub async fn run(&self, state: &ScanState, to_block: u64) -> ScanResult<ScanSummary> {
        let mut summary = ScanSummary::default();
        let symbol = self.symbol;

        if !state.needs_scan(to_block) {
            tracing::info!(
                symbol,
                last_loaded_block = ?state.last_loaded_block,
                to_block,
                "already loaded up to the target block, nothing to scan"
            );
            return Ok(summary);
        }

        for range in BatchRanges::new(state.scan_from, to_block, self.blocks_per_batch) {
            if summary.batches > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            summary.batches += 1;

            let (from, to) = (*range.start(), *range.end());
            tracing::info!(symbol, batch = summary.batches, from, to, "scanning batch");

            match self.source.transfers(from, to).await {
                Ok(events) => {
                    if !events.is_empty() {
                        tracing::info!(symbol, events = events.len(), "imported events");
                    }
                    summary.add_persisted(self.persist(events)?);
                }
                Err(e) if e.is_remote() => {
                    tracing::warn!(
                        symbol,
                        from,
                        to,
                        error = %e,
                        "batch fetch failed, checking block by block"
                    );
                    summary.fallbacks += 1;
                    summary.add_persisted(self.block_by_block(from, to).await?);
                }
                Err(e) => return Err(e.into()),
            }

            self.ledger.append(&LedgerEntry::now(symbol, to, state.mode))?;
        }

        tracing::info!(
            symbol,
            batches = summary.batches,
            fallbacks = summary.fallbacks,
            blocks = summary.blocks_written,
            events = summary.events,
            "done scanning events"
        );
        Ok(summary)
    }

    /// Re-fetch `[from, to]` one block at a time, persisting each block as
    /// soon as it arrives.
    async fn block_by_block(&self, from: u64, to: u64) -> ScanResult<(u64, u64)> {
        let mut totals = (0, 0);
        for block in from..=to {
            let events = self.source.transfers(block, block).await.map_err(|e| {
                tracing::error!(symbol = self.symbol, block, error = %e, "block fetch failed");
                e
            })?;
            let (blocks, count) = self.persist(events)?;
            totals.0 += blocks;
            totals.1 += count;
        }
        Ok(totals)
    }

    /// Group `events` by block and write one file per block. Returns the
    /// number of files and events written.
    fn persist(&self, events: Vec<TransferEvent>) -> ScanResult<(u64, u64)> {
        let mut totals = (0, 0);
        for (block, group) in store::group_by_block(events) {
            self.store.write(self.symbol, block, &group)?;
            totals.0 += 1;
            totals.1 += group.len() as u64;
        }
        Ok(totals)
    }
}
