//! Shared types for the watcher pipeline.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::DecodeError;

// ─── LogFilter ────────────────────────────────────────────────────────────────

/// The `eth_getLogs` filter for the watched event: one contract, one topic0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    /// Contract address (`0x…`).
    pub address: String,
    /// Event topic hash (`0x…`, 32 bytes).
    pub topic0: String,
}

impl LogFilter {
    pub fn new(address: impl Into<String>, topic0: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            topic0: topic0.into(),
        }
    }

    /// Returns `true` if `log` was emitted by the filtered contract with the filtered topic0.
    pub fn matches(&self, log: &RawLog) -> bool {
        log.address.eq_ignore_ascii_case(&self.address)
            && log
                .topics
                .first()
                .is_some_and(|t| t.eq_ignore_ascii_case(&self.topic0))
    }
}

// ─── RawLog ───────────────────────────────────────────────────────────────────

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
    #[serde(rename = "blockHash", default)]
    pub block_hash: Option<String>,
    #[serde(rename = "transactionHash", default)]
    pub tx_hash: Option<String>,
    #[serde(rename = "logIndex", default)]
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: Option<bool>,
}

/// One entry of an `eth_getLogs` result. Entries the node sent in an
/// unexpected shape are kept as errors so they can be skipped one by one.
pub type LogEntry = Result<RawLog, DecodeError>;

impl RawLog {
    /// Convert a single JSON log object.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        serde_json::from_value(value).map_err(|e| DecodeError::MalformedLog {
            reason: e.to_string(),
        })
    }

    /// Block number, if the node reported a well-formed one.
    pub fn block_number_u64(&self) -> Option<u64> {
        self.block_number.as_deref().and_then(parse_quantity)
    }

    /// Log index within the block, if reported.
    pub fn log_index_u64(&self) -> Option<u64> {
        self.log_index.as_deref().and_then(parse_quantity)
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}

/// Parse a JSON-RPC hex quantity (`0x1a`) into a `u64`.
///
/// Returns `None` for a missing prefix, empty digits or overflow.
pub fn parse_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Format a `u64` as a JSON-RPC hex quantity.
pub fn to_quantity(n: u64) -> String {
    format!("{n:#x}")
}

// ─── Decoded events ───────────────────────────────────────────────────────────

/// `ColorChanged(uint256 indexed tokenId, uint8 r, uint8 g, uint8 b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorChanged {
    #[serde(serialize_with = "serialize_decimal")]
    pub token_id: U256,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for ColorChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ColorChanged: Token ID: {}, RGB: ({}, {}, {})",
            self.token_id, self.r, self.g, self.b
        )
    }
}

/// A decoded event together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub block_number: Option<u64>,
    pub tx_hash: Option<String>,
    pub log_index: Option<u64>,
    #[serde(flatten)]
    pub event: ColorChanged,
}

impl EventRecord {
    /// Attach provenance from `log` to an already decoded event.
    pub fn from_log(log: &RawLog, event: ColorChanged) -> Self {
        Self {
            block_number: log.block_number_u64(),
            tx_hash: log.tx_hash.clone(),
            log_index: log.log_index_u64(),
            event,
        }
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event)?;
        let block = self.block_number.map(|n| n.to_string());
        let log_index = self.log_index.map(|n| n.to_string());
        write!(
            f,
            " [block {}, tx {}, log {}]",
            block.as_deref().unwrap_or("?"),
            self.tx_hash.as_deref().unwrap_or("?"),
            log_index.as_deref().unwrap_or("?"),
        )
    }
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
