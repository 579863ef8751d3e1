//! Transport-level error types.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to a JSON-RPC node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure and similar.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The node answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response body could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The HTTP client could not be constructed.
    #[error("Client build error: {0}")]
    Build(String),
}

impl TransportError {
    /// Returns `true` if the request may succeed when sent again.
    ///
    /// Server-side 5xx and 429 are transient; other statuses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
