//! Event topic computation.
//!
//! The topic of an EVM event is the keccak256 hash of its canonical
//! signature string, e.g.:
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef

use std::fmt;

use tiny_keccak::{Hasher, Keccak};

pub use chainwatch_core::config::validate_signature;

/// A 32-byte event topic, held as `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a topic string from a log.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the keccak256 topic of an event signature string.
/// Input: `"EventName(type1,type2,...)"`: the canonical ABI signature.
pub fn keccak256_signature(signature: &str) -> Topic {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(signature.as_bytes());
    hasher.finalize(&mut output);
    Topic(format!("0x{}", hex::encode(output)))
}
