//! `ColorChanged` decoder.
//!
//! # Layout
//! - `topics[0]`: event topic
//! - `topics[1]`: `tokenId`, uint256, 32 bytes big-endian
//! - `data`: `(uint8 r, uint8 g, uint8 b)` as three 32-byte ABI words
//!
//! Every failure is a [`DecodeError`] scoped to the one log being decoded.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::U256;
use chainwatch_core::error::DecodeError;
use chainwatch_core::types::{ColorChanged, RawLog};

use crate::topic::Topic;

const WORD: usize = 32;
const COLOR_FIELDS: [&str; 3] = ["r", "g", "b"];

/// Decode a raw log into a `ColorChanged` event.
pub fn decode_color_changed(log: &RawLog, expected: &Topic) -> Result<ColorChanged, DecodeError> {
    let topic0 = log
        .topics
        .first()
        .ok_or(DecodeError::MissingTopic { index: 0 })?;
    if !expected.matches(topic0) {
        return Err(DecodeError::TopicMismatch {
            expected: expected.to_string(),
            actual: topic0.clone(),
        });
    }

    let token_id = decode_token_id(log)?;
    let [r, g, b] = decode_colors(&log.data)?;

    Ok(ColorChanged { token_id, r, g, b })
}

/// Indexed value types are stored directly in their topic, left-padded to 32 bytes.
fn decode_token_id(log: &RawLog) -> Result<U256, DecodeError> {
    let topic = log
        .topics
        .get(1)
        .ok_or(DecodeError::MissingTopic { index: 1 })?;
    let bytes = decode_hex("topics[1]", topic)?;
    if bytes.len() != WORD {
        return Err(DecodeError::InvalidTopicLength {
            index: 1,
            len: bytes.len(),
        });
    }

    match DynSolType::Uint(256).abi_decode(&bytes) {
        Ok(DynSolValue::Uint(value, _)) => Ok(value),
        Ok(other) => Err(DecodeError::AbiDecodeFailed {
            reason: format!("tokenId decoded as {other:?}"),
        }),
        Err(e) => Err(DecodeError::AbiDecodeFailed {
            reason: format!("topic decode: {e}"),
        }),
    }
}

fn decode_colors(data: &str) -> Result<[u8; 3], DecodeError> {
    let bytes = decode_hex("data", data)?;
    let expected = WORD * COLOR_FIELDS.len();
    if bytes.len() != expected {
        return Err(DecodeError::DataLength {
            expected,
            actual: bytes.len(),
        });
    }

    // Full words are read so that dirty high bytes are reported per field.
    let tuple = DynSolType::Tuple(vec![DynSolType::Uint(256); COLOR_FIELDS.len()]);
    let values = match tuple.abi_decode(&bytes) {
        Ok(DynSolValue::Tuple(values)) => values,
        Ok(other) => {
            return Err(DecodeError::AbiDecodeFailed {
                reason: format!("data decoded as {other:?}"),
            })
        }
        Err(e) => {
            return Err(DecodeError::AbiDecodeFailed {
                reason: e.to_string(),
            })
        }
    };

    let mut out = [0u8; 3];
    for ((slot, field), value) in out.iter_mut().zip(COLOR_FIELDS).zip(values) {
        *slot = narrow_u8(field, value)?;
    }
    Ok(out)
}

fn narrow_u8(field: &str, value: DynSolValue) -> Result<u8, DecodeError> {
    match value {
        DynSolValue::Uint(v, _) => u8::try_from(v).map_err(|_| DecodeError::OutOfRange {
            field: field.to_string(),
            value: v.to_string(),
        }),
        other => Err(DecodeError::AbiDecodeFailed {
            reason: format!("field '{field}' decoded as {other:?}"),
        }),
    }
}

fn decode_hex(field: &str, s: &str) -> Result<Vec<u8>, DecodeError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| DecodeError::InvalidHex {
        field: field.to_string(),
        reason: e.to_string(),
    })
}
