//! The remote event source the scanner reads from.
//!
//! [`EventSource`] is the seam between the scanning core and the chain.
//! [`RpcSource`] is the production implementation on top of an alloy
//! provider; tests substitute an in-memory source.

use std::future::Future;
use std::time::Duration;

use alloy::providers::Provider;
use erc20_snapshot::{Erc20Token, TokenMetadata, TransferEvent};

use crate::error::FetchError;

/// Per-request timeout for RPC calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote source of token metadata and `Transfer` events.
pub trait EventSource {
    /// Token `name`, `symbol` and `decimals`.
    fn token_metadata(&self) -> impl Future<Output = Result<TokenMetadata, FetchError>> + Send;

    /// Current chain height.
    fn block_number(&self) -> impl Future<Output = Result<u64, FetchError>> + Send;

    /// All transfer events in the inclusive range `[from, to]`, in chain
    /// order.
    fn transfers(
        &self,
        from: u64,
        to: u64,
    ) -> impl Future<Output = Result<Vec<TransferEvent>, FetchError>> + Send;
}

/// [`EventSource`] backed by a JSON-RPC node.
#[derive(Debug, Clone)]
pub struct RpcSource<P> {
    token: Erc20Token<P>,
    timeout: Duration,
}

impl<P: Provider> RpcSource<P> {
    /// Wrap a token client using the default [`REQUEST_TIMEOUT`].
    pub const fn new(token: Erc20Token<P>) -> Self {
        Self {
            token,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Bound a request by `limit`; an elapsed timer becomes [`FetchError::Timeout`].
async fn timed<T>(
    limit: Duration,
    fut: impl Future<Output = erc20_snapshot::Result<T>>,
) -> Result<T, FetchError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::from)
}

impl<P: Provider> EventSource for RpcSource<P> {
    async fn token_metadata(&self) -> Result<TokenMetadata, FetchError> {
        timed(self.timeout, self.token.metadata()).await
    }

    async fn block_number(&self) -> Result<u64, FetchError> {
        timed(self.timeout, self.token.block_number()).await
    }

    async fn transfers(&self, from: u64, to: u64) -> Result<Vec<TransferEvent>, FetchError> {
        if from > to {
            return Err(FetchError::InvalidRange { from, to });
        }
        timed(self.timeout, self.token.transfers(from, to)).await
    }
}
