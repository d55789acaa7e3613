//! Error types for token access.

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while talking to a token contract or decoding its logs.
///
/// Every variant describes a failure of the remote side (transport, node,
/// or the data it returned), never a local programming error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The JSON-RPC transport failed or the node returned an error.
    #[error("transport error: {0}")]
    Transport(#[from] alloy::transports::TransportError),

    /// A contract `eth_call` failed or returned undecodable data.
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    /// A log returned by `eth_getLogs` is not a well-formed `Transfer` log.
    #[error("malformed Transfer log: {0}")]
    MalformedLog(String),
}
