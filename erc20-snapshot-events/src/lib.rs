//! Resumable ERC-20 `Transfer` event harvester.
//!
//! Scans a token's history in bounded batches, persists events one JSON
//! file per block, and resumes from on-disk state on the next run so that
//! history is never rescanned or lost. The persisted events feed a separate
//! balance aggregation stage.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod load_mode;
pub mod scanner;
pub mod source;
pub mod store;

pub use coordinator::{ScanOutput, check_symbol, get_events};
pub use error::{FetchError, ScanError, StoreError};
pub use load_mode::{LoadMode, ScanState};
pub use source::{EventSource, RpcSource};
