//! Runtime configuration loaded from `config.toml`.
//!
//! Every key is optional. When no config file is present the defaults
//! below are used, so a scan only needs a contract address (which can also
//! come from the command line).
//!
//! ```toml
//! rpc = "http://localhost:8545"
//! contract = "0xdAC17F958D2ee523a2206206994597C13D831ec7"
//! from_block = 4634748
//! to_block = "latest"
//! blocks_per_batch = 2000
//! delay = 250
//! events_dir = "tx/{token}"
//! balances_dir = "balances"
//! ledger_dir = "progress"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

/// Placeholder in [`Config::events_dir`] replaced by the token symbol.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON-RPC endpoint of the node to scan.
    pub rpc: String,

    /// Address of the ERC-20 contract.
    pub contract: Option<Address>,

    /// First block of a fresh scan. Defaults to genesis.
    pub from_block: Option<u64>,

    /// Last block to scan.
    #[serde(deserialize_with = "deserialize_to_block")]
    pub to_block: ToBlock,

    /// Width of each batch; `0` scans the whole range in one batch.
    pub blocks_per_batch: u64,

    /// Pause between batches, in milliseconds; `0` disables it.
    pub delay: u64,

    /// Per-token block file folder; `{token}` is replaced by the symbol.
    pub events_dir: String,

    /// Folder where the aggregation stage writes `{symbol}-{block}` files.
    pub balances_dir: PathBuf,

    /// Folder holding the per-token progress ledgers.
    pub ledger_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: "http://localhost:8545".to_owned(),
            contract: None,
            from_block: None,
            to_block: ToBlock::Latest,
            blocks_per_batch: 0,
            delay: 0,
            events_dir: format!("tx/{TOKEN_PLACEHOLDER}"),
            balances_dir: PathBuf::from("balances"),
            ledger_dir: PathBuf::from("progress"),
        }
    }
}

/// Upper bound of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToBlock {
    /// Chain height at the time the scan starts.
    #[default]
    Latest,
    /// A fixed block number.
    Number(u64),
}

impl std::str::FromStr for ToBlock {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        s.parse().map(Self::Number)
    }
}

/// Deserialize a [`ToBlock`] from a JSON/TOML number, a numeric string, or
/// the string `"latest"`.
fn deserialize_to_block<'de, D>(deserializer: D) -> Result<ToBlock, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNum {
        Num(u64),
        Str(String),
    }
    match StringOrNum::deserialize(deserializer)? {
        StringOrNum::Num(n) => Ok(ToBlock::Number(n)),
        StringOrNum::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns [`Config::default`] if the file does not exist,
    /// allowing the binary to work without any config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Inter-batch delay as a [`Duration`].
    #[must_use]
    pub const fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = Config::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(cfg.to_block, ToBlock::Latest, "default to_block");
        assert_eq!(cfg.blocks_per_batch, 0, "default batch size");
        assert_eq!(cfg.events_dir, "tx/{token}", "default events dir");
        assert!(cfg.contract.is_none(), "no default contract");
    }

    #[test]
    fn parses_full_file() {
        let cfg: Config = toml::from_str(
            r#"
            rpc = "https://rpc.example"
            contract = "0x1111111111111111111111111111111111111111"
            from_block = 100
            to_block = 250
            blocks_per_batch = 100
            delay = 50
            events_dir = "data/{token}/tx"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.rpc, "https://rpc.example", "rpc");
        assert_eq!(cfg.from_block, Some(100), "from_block");
        assert_eq!(cfg.to_block, ToBlock::Number(250), "to_block");
        assert_eq!(cfg.batch_delay(), Duration::from_millis(50), "delay");
        assert_eq!(cfg.balances_dir, PathBuf::from("balances"), "unset keys default");
    }

    #[test]
    fn to_block_accepts_latest_and_numeric_strings() {
        let latest: Config = toml::from_str(r#"to_block = "latest""#).unwrap();
        assert_eq!(latest.to_block, ToBlock::Latest, "sentinel");

        let numeric: Config = toml::from_str(r#"to_block = "1234""#).unwrap();
        assert_eq!(numeric.to_block, ToBlock::Number(1234), "numeric string");

        assert!(
            toml::from_str::<Config>(r#"to_block = "soon""#).is_err(),
            "garbage is rejected"
        );
    }
}
