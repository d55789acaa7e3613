//! ERC-20 token access for balance snapshot tooling.
//!
//! Provides the on-chain side of the snapshot pipeline: reading token
//! metadata and decoding `Transfer` logs into [`TransferEvent`]s that can
//! be persisted and aggregated later.
//!
//! ```no_run
//! use alloy::{primitives::address, providers::ProviderBuilder};
//! use erc20_snapshot::Erc20Token;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse()?);
//! let token = Erc20Token::new(address!("dAC17F958D2ee523a2206206994597C13D831ec7"), provider);
//!
//! let meta = token.metadata().await?;
//! let head = token.block_number().await?;
//! let events = token.transfers(head.saturating_sub(100), head).await?;
//! println!("{} transfers of {} in the last 100 blocks", events.len(), meta.symbol);
//! # Ok(())
//! # }
//! ```

pub mod contracts;
pub mod error;
pub mod token;
pub mod types;

pub use error::{Error, Result};
pub use token::Erc20Token;
pub use types::{TokenMetadata, TransferEvent};
