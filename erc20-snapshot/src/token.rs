//! Read-only client for a single ERC-20 contract.

use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;

use crate::contracts::IERC20;
use crate::error::Result;
use crate::types::{TokenMetadata, TransferEvent};

/// Handle to an ERC-20 contract behind an alloy [`Provider`].
#[derive(Debug, Clone)]
pub struct Erc20Token<P> {
    address: Address,
    provider: P,
}

impl<P: Provider> Erc20Token<P> {
    /// Create a client for the token deployed at `address`.
    pub const fn new(address: Address, provider: P) -> Self {
        Self { address, provider }
    }

    /// The token contract address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Read `name()`, `symbol()` and `decimals()` from the contract.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three calls fails.
    pub async fn metadata(&self) -> Result<TokenMetadata> {
        let contract = IERC20::new(self.address, &self.provider);
        let name = contract.name().call().await?;
        let symbol = contract.symbol().call().await?;
        let decimals = contract.decimals().call().await?;
        Ok(TokenMetadata {
            name,
            symbol,
            decimals,
        })
    }

    /// Current chain height as reported by the node.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    pub async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    /// Fetch every `Transfer` log of this token in `[from, to]` with a
    /// single `eth_getLogs` query.
    ///
    /// The query is all-or-nothing: a failure anywhere in the range fails
    /// the whole call.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails or any returned log cannot be
    /// decoded as a `Transfer`.
    pub async fn transfers(&self, from: u64, to: u64) -> Result<Vec<TransferEvent>> {
        let filter = Filter::new()
            .address(self.address)
            .event_signature(IERC20::Transfer::SIGNATURE_HASH)
            .from_block(from)
            .to_block(to);

        let logs = self.provider.get_logs(&filter).await?;
        logs.iter().map(TransferEvent::from_log).collect()
    }
}
