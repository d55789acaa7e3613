//! Error taxonomy for the scanning core.
//!
//! [`FetchError`] separates failures of the remote event source from local
//! programming errors, so the block-by-block fallback only ever runs for
//! the former. [`StoreError`] covers the on-disk block files and progress
//! ledger. [`ScanError`] is what a scan run surfaces to its caller.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while fetching from the remote event source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The node, transport or returned data was bad.
    #[error(transparent)]
    Remote(#[from] erc20_snapshot::Error),

    /// The request did not complete within the per-request timeout.
    #[error("request timed out")]
    Timeout,

    /// A range with `from > to` was requested. This is a bug in the caller,
    /// not a remote failure.
    #[error("invalid block range {from}..={to}")]
    InvalidRange {
        /// Requested first block.
        from: u64,
        /// Requested last block.
        to: u64,
    },
}

impl FetchError {
    /// Whether the failure came from the remote side and may succeed when
    /// retried at a finer granularity.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Timeout)
    }
}

/// Failure while reading or writing local scan state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("{action} {}: {source}", path.display())]
    Io {
        /// What was being attempted (e.g. `"writing"`).
        action: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file could not be encoded or decoded as JSON.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        /// Offending file.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Error returned by a scan run.
///
/// Fetch errors are passed through unchanged; anything already flushed to
/// disk before the failure stays there and is picked up by the next run.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Fetching from the remote source failed and could not be recovered.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Local scan state could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The token symbol cannot be used as a path component.
    #[error("token symbol {0:?} is not usable as a directory name")]
    InvalidSymbol(String),
}

/// Convenience alias for scan results.
pub type ScanResult<T> = Result<T, ScanError>;
