//! Core domain types for ERC-20 snapshots.
//!
//! [`TransferEvent`] is the unit that gets fetched, grouped by block and
//! persisted; [`TokenMetadata`] is read once per run from the contract.

use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use serde::{Deserialize, Serialize};

use crate::contracts::IERC20;
use crate::error::{Error, Result};

/// A single decoded `Transfer(address,address,uint256)` log.
///
/// Events are immutable once decoded; the block number is the grouping key
/// used when events are persisted one file per block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Block the log was emitted in.
    pub block_number: u64,

    /// Hash of the emitting transaction.
    pub transaction_hash: B256,

    /// Position of the log within its block.
    pub log_index: u64,

    /// Sender of the tokens (`address(0)` for mints).
    pub from: Address,

    /// Recipient of the tokens (`address(0)` for burns).
    pub to: Address,

    /// Raw token amount, not scaled by decimals.
    pub value: U256,
}

impl TransferEvent {
    /// Decode a raw RPC log into a [`TransferEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedLog`] if the log is pending (no block
    /// number, transaction hash or log index) or is not a `Transfer` log.
    pub fn from_log(log: &Log) -> Result<Self> {
        let (Some(block_number), Some(transaction_hash), Some(log_index)) =
            (log.block_number, log.transaction_hash, log.log_index)
        else {
            return Err(Error::MalformedLog(
                "missing block number, transaction hash or log index".to_owned(),
            ));
        };

        let decoded = log
            .log_decode::<IERC20::Transfer>()
            .map_err(|e| Error::MalformedLog(format!("block {block_number}: {e}")))?;
        let transfer = decoded.data();

        Ok(Self {
            block_number,
            transaction_hash,
            log_index,
            from: transfer.from,
            to: transfer.to,
            value: transfer.value,
        })
    }
}

/// Token metadata read from the contract at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Human-readable token name.
    pub name: String,

    /// Ticker symbol; also used to namespace on-disk state.
    pub symbol: String,

    /// Number of decimal places used by the token.
    pub decimals: u8,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use alloy::primitives::{LogData, address};
    use alloy::sol_types::SolEvent;

    use super::*;

    const TOKEN: Address = address!("1111111111111111111111111111111111111111");
    const ALICE: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const BOB: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    fn rpc_log(data: LogData, block_number: Option<u64>) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: TOKEN,
                data,
            },
            block_hash: None,
            block_number,
            block_timestamp: None,
            transaction_hash: Some(B256::repeat_byte(0xab)),
            transaction_index: Some(0),
            log_index: Some(7),
            removed: false,
        }
    }

    fn transfer_data(value: u64) -> LogData {
        IERC20::Transfer {
            from: ALICE,
            to: BOB,
            value: U256::from(value),
        }
        .encode_log_data()
    }

    #[test]
    fn decodes_transfer_log() {
        let event = TransferEvent::from_log(&rpc_log(transfer_data(500), Some(42))).unwrap();

        assert_eq!(event.block_number, 42, "block number");
        assert_eq!(event.log_index, 7, "log index");
        assert_eq!(event.from, ALICE, "sender");
        assert_eq!(event.to, BOB, "recipient");
        assert_eq!(event.value, U256::from(500), "value");
        assert_eq!(event.transaction_hash, B256::repeat_byte(0xab), "tx hash");
    }

    #[test]
    fn pending_log_is_malformed() {
        let err = TransferEvent::from_log(&rpc_log(transfer_data(1), None)).unwrap_err();
        assert!(matches!(err, Error::MalformedLog(_)), "got {err:?}");
    }

    #[test]
    fn foreign_event_is_malformed() {
        let data = LogData::new_unchecked(vec![B256::repeat_byte(0x01)], Default::default());
        let err = TransferEvent::from_log(&rpc_log(data, Some(1))).unwrap_err();
        assert!(matches!(err, Error::MalformedLog(_)), "got {err:?}");
    }

    #[test]
    fn serializes_value_as_hex_quantity() {
        let event = TransferEvent::from_log(&rpc_log(transfer_data(255), Some(9))).unwrap();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["block_number"], 9, "block number stays numeric");
        assert_eq!(json["value"], "0xff", "U256 serializes as hex");

        let back: TransferEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event, "JSON form reloads losslessly");
    }
}
