//! Error types for the watcher pipeline.

use thiserror::Error;

/// Errors that can occur while decoding a single log.
///
/// A decode error only ever affects the log it was raised for.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("topic[0] {actual} does not match expected event topic {expected}")]
    TopicMismatch { expected: String, actual: String },

    #[error("Missing topic at index {index}")]
    MissingTopic { index: usize },

    #[error("Topic {index} has {len} bytes, expected 32")]
    InvalidTopicLength { index: usize, len: usize },

    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex { field: String, reason: String },

    #[error("Data payload is {actual} bytes, expected {expected}")]
    DataLength { expected: usize, actual: usize },

    #[error("Field '{field}' value {value} does not fit in uint8")]
    OutOfRange { field: String, value: String },

    #[error("ABI decode failed: {reason}")]
    AbiDecodeFailed { reason: String },

    #[error("Malformed log object: {reason}")]
    MalformedLog { reason: String },
}

/// Errors that can occur while watching a contract.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("RPC call '{method}' timed out after {ms}ms")]
    Timeout { method: String, ms: u64 },

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),

    #[error("Startup failed: {reason}")]
    Startup { reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Sink '{sink}' failed: {reason}")]
    Sink { sink: String, reason: String },
}

impl WatchError {
    /// Returns `true` if the error is worth retrying on the next poll cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Rpc(_) | Self::Timeout { .. } | Self::MalformedResponse(_)
        )
    }
}
