#![allow(dead_code, unreachable_pub, clippy::unwrap_used, reason = "shared test helpers")]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use alloy::primitives::{Address, B256, U256};
use erc20_snapshot::{TokenMetadata, TransferEvent};
use erc20_snapshot_events::config::{Config, ToBlock};
use erc20_snapshot_events::{EventSource, FetchError};

/// A transfer at `block` whose addresses are derived from `seed`.
pub fn transfer(block: u64, log_index: u64, seed: u8) -> TransferEvent {
    TransferEvent {
        block_number: block,
        transaction_hash: B256::repeat_byte(seed),
        log_index,
        from: Address::repeat_byte(seed),
        to: Address::repeat_byte(seed.wrapping_add(1)),
        value: U256::from(u64::from(seed) * 1_000),
    }
}

/// In-memory chain with scripted failures.
#[derive(Debug)]
pub struct FakeSource {
    pub symbol: String,
    pub height: u64,
    pub events: Vec<TransferEvent>,
    /// Multi-block queries for exactly these ranges time out.
    pub failing_ranges: HashSet<(u64, u64)>,
    /// Single-block queries for these blocks time out.
    pub failing_blocks: HashSet<u64>,
    /// Every query answers with a non-remote error.
    pub broken: bool,
    calls: Mutex<Vec<(u64, u64)>>,
}

impl FakeSource {
    pub fn new(symbol: &str, height: u64, events: Vec<TransferEvent>) -> Self {
        Self {
            symbol: symbol.to_owned(),
            height,
            events,
            failing_ranges: HashSet::new(),
            failing_blocks: HashSet::new(),
            broken: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_range(mut self, from: u64, to: u64) -> Self {
        self.failing_ranges.insert((from, to));
        self
    }

    pub fn fail_block(mut self, block: u64) -> Self {
        self.failing_blocks.insert(block);
        self
    }

    /// `transfers` queries received so far, in order.
    pub fn calls(&self) -> Vec<(u64, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl EventSource for FakeSource {
    async fn token_metadata(&self) -> Result<TokenMetadata, FetchError> {
        Ok(TokenMetadata {
            name: format!("{} Token", self.symbol),
            symbol: self.symbol.clone(),
            decimals: 18,
        })
    }

    async fn block_number(&self) -> Result<u64, FetchError> {
        Ok(self.height)
    }

    async fn transfers(&self, from: u64, to: u64) -> Result<Vec<TransferEvent>, FetchError> {
        self.calls.lock().unwrap().push((from, to));
        if self.broken {
            return Err(FetchError::InvalidRange { from, to });
        }
        let failing = if from == to {
            self.failing_blocks.contains(&from)
        } else {
            self.failing_ranges.contains(&(from, to))
        };
        if failing {
            return Err(FetchError::Timeout);
        }
        Ok(self
            .events
            .iter()
            .filter(|e| (from..=to).contains(&e.block_number))
            .cloned()
            .collect())
    }
}

/// Scratch workspace with a config pointing all state into a temp dir.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub config: Config,
}

impl Workspace {
    pub fn new(to_block: ToBlock, blocks_per_batch: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            to_block,
            blocks_per_batch,
            events_dir: dir.path().join("tx/{token}").to_string_lossy().into_owned(),
            balances_dir: dir.path().join("balances"),
            ledger_dir: dir.path().join("progress"),
            ..Config::default()
        };
        Self { dir, config }
    }

    pub fn events_folder(&self, symbol: &str) -> PathBuf {
        self.dir.path().join("tx").join(symbol)
    }

    /// Sorted names of the block files written for `symbol`.
    pub fn block_files(&self, symbol: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.events_folder(symbol)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort_by_key(|n| n.trim_end_matches(".json").parse::<u64>().unwrap_or(0));
        names
    }

    /// Raw contents of every block file of `symbol`, keyed by file name.
    pub fn snapshot(&self, symbol: &str) -> Vec<(String, Vec<u8>)> {
        self.block_files(symbol)
            .into_iter()
            .map(|name| {
                let bytes = std::fs::read(self.events_folder(symbol).join(&name)).unwrap();
                (name, bytes)
            })
            .collect()
    }

    pub fn touch_balances_file(&self, name: &str) {
        std::fs::create_dir_all(&self.config.balances_dir).unwrap();
        std::fs::write(self.config.balances_dir.join(name), "wallet,balance\n").unwrap();
    }

    pub fn touch_block_file(&self, symbol: &str, name: &str) {
        let folder = self.events_folder(symbol);
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join(name), "[]").unwrap();
    }
}
