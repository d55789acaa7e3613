//! ERC-20 transfer event harvester CLI.
//!
//! Scans a token contract's `Transfer` logs into per-block JSON files and
//! resumes from where the previous run stopped.
//!
//! # Usage
//!
//! ```bash
//! # Scan using ./config.toml
//! erc20-snapshot-events scan
//!
//! # Scan a specific token up to a fixed block
//! erc20-snapshot-events scan --contract 0xdAC17F958D2ee523a2206206994597C13D831ec7 --to-block 5000000
//!
//! # Hand the result to the aggregation stage as JSON
//! erc20-snapshot-events scan --output scan.json
//!
//! # Show where the next scan of a token would resume
//! erc20-snapshot-events status --symbol USDT
//! ```

use std::path::PathBuf;

use alloy::primitives::Address;
use alloy::providers::ProviderBuilder;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use erc20_snapshot::Erc20Token;
use erc20_snapshot_events::config::{Config, ToBlock};
use erc20_snapshot_events::ledger::Ledger;
use erc20_snapshot_events::load_mode::LoadModeResolver;
use erc20_snapshot_events::store::BlockFileStore;
use erc20_snapshot_events::{RpcSource, check_symbol, get_events};

/// ERC-20 transfer event harvester.
#[derive(Debug, Parser)]
#[command(name = "erc20-snapshot-events", version, about)]
struct Cli {
    /// Path to the TOML config file. Defaults apply if it does not exist.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch new transfer events and persist them per block.
    Scan {
        /// Override the RPC endpoint from the config file.
        #[arg(long)]
        rpc: Option<String>,

        /// Override the token contract address from the config file.
        #[arg(long)]
        contract: Option<Address>,

        /// Override the target block (a number or `latest`).
        #[arg(long)]
        to_block: Option<ToBlock>,

        /// Write the scan result as JSON to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the resume state of a token without contacting the node.
    Status {
        /// Token symbol as used in the events folder name.
        #[arg(long)]
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Command::Scan {
            rpc,
            contract,
            to_block,
            output,
        } => {
            if let Some(rpc) = rpc {
                config.rpc = rpc;
            }
            if let Some(contract) = contract {
                config.contract = Some(contract);
            }
            if let Some(to_block) = to_block {
                config.to_block = to_block;
            }
            cmd_scan(&config, output).await
        }
        Command::Status { symbol } => cmd_status(&config, &symbol),
    }
}

/// Execute the `scan` subcommand.
async fn cmd_scan(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let contract = config
        .contract
        .context("no token contract configured (set `contract` or pass --contract)")?;

    tracing::info!(rpc = %config.rpc, %contract, "connecting");
    let provider = ProviderBuilder::new().connect_http(
        config
            .rpc
            .parse()
            .with_context(|| format!("invalid RPC URL: {}", config.rpc))?,
    );
    let source = RpcSource::new(Erc20Token::new(contract, provider));

    let out = get_events(&source, config).await?;
    tracing::info!(
        symbol = %out.symbol,
        mode = %out.load_mode.mode,
        from = out.from_block,
        to = out.to_block,
        batches = out.summary.batches,
        fallbacks = out.summary.fallbacks,
        new_events = out.summary.events,
        total_events = out.events.len(),
        new_addresses = out.new_addresses.len(),
        "scan finished"
    );

    if let Some(path) = output {
        let json = serde_json::to_vec_pretty(&out).context("encoding scan output")?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote scan output");
    }

    Ok(())
}

/// Execute the `status` subcommand.
#[allow(clippy::print_stdout)]
fn cmd_status(config: &Config, symbol: &str) -> Result<()> {
    check_symbol(symbol)?;
    let store = BlockFileStore::new(config.events_dir.as_str());
    let ledger = Ledger::new(&config.ledger_dir);
    let state = LoadModeResolver::new(&store, &ledger, &config.balances_dir, config.from_block)
        .resolve(symbol)?;
    let last = ledger.last(symbol)?;

    println!("{:<20} {}", "Symbol", symbol);
    println!("{:<20} {}", "Events folder", store.folder(symbol).display());
    println!("{:<20} {}", "Mode", state.mode);
    println!("{:<20} {}", "Scan from", state.scan_from);
    println!(
        "{:<20} {}",
        "Last loaded block",
        state
            .last_loaded_block
            .map_or_else(|| "-".to_owned(), |b| b.to_string())
    );
    if let Some(file) = &state.balances_file {
        println!("{:<20} {}", "Balances file", file);
    }
    println!(
        "{:<20} {}",
        "Ledger",
        last.map_or_else(
            || "-".to_owned(),
            |e| format!("block {} ({}) in {}", e.last_block, e.mode, ledger.dir().display())
        )
    );

    Ok(())
}
