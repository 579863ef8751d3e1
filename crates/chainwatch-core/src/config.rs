//! Watcher configuration.

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::WatchError;

/// Canonical signature of the watched event.
pub const COLOR_CHANGED_SIGNATURE: &str = "ColorChanged(uint256,uint8,uint8,uint8)";

/// Contract the worker was deployed against.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x64376a051E77b7D7181C3DfBb49c3c83e127704b";

/// Configuration for an `EventPoller`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Contract whose logs are watched.
    pub contract_address: String,
    /// Canonical event signature, e.g. `"ColorChanged(uint256,uint8,uint8,uint8)"`.
    pub event_signature: String,
    /// Expected chain id. `None` = accept whatever the node reports.
    pub chain_id: Option<u64>,
    /// Delay between poll iterations (milliseconds).
    pub poll_interval_ms: u64,
    /// Upper bound on a single RPC call (milliseconds).
    pub request_timeout_ms: u64,
    /// Maximum number of blocks per `eth_getLogs` request.
    pub max_block_range: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS.into(),
            event_signature: COLOR_CHANGED_SIGNATURE.into(),
            chain_id: None,
            poll_interval_ms: 2000,
            request_timeout_ms: 10_000,
            max_block_range: 1000,
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), WatchError> {
        self.contract_address
            .parse::<Address>()
            .map_err(|e| {
                WatchError::Config(format!(
                    "invalid contract address '{}': {e}",
                    self.contract_address
                ))
            })?;
        validate_signature(&self.event_signature)?;
        if self.poll_interval_ms == 0 {
            return Err(WatchError::Config("poll interval must be > 0".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(WatchError::Config("request timeout must be > 0".into()));
        }
        if self.max_block_range == 0 {
            return Err(WatchError::Config("max block range must be > 0".into()));
        }
        Ok(())
    }
}

/// Reject strings that are not shaped like `Name(type1,type2,...)`.
pub fn validate_signature(signature: &str) -> Result<(), WatchError> {
    let invalid = |reason: &str| {
        Err(WatchError::Config(format!(
            "invalid event signature '{signature}': {reason}"
        )))
    };

    let Some(open) = signature.find('(') else {
        return invalid("missing '('");
    };
    if !signature.ends_with(')') {
        return invalid("must end with ')'");
    }

    let name = &signature[..open];
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return invalid("event name must start with a letter or '_'"),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return invalid("event name contains invalid characters");
    }

    let params = &signature[open + 1..signature.len() - 1];
    if !params
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ',' | '[' | ']' | '(' | ')'))
    {
        return invalid("parameter list must not contain whitespace or names");
    }
    Ok(())
}
