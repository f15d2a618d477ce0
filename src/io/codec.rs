//! Column key codec
//!
//! Column ids are stored as fixed-width big-endian keys so that byte order
//! and numeric order agree.

use crate::error::{Result, StoreError};

/// Encoded column key length
pub const COLUMN_KEY_SIZE: usize = 8;

/// Encode a column id as an 8-byte big-endian key
pub fn encode_column(col: u64) -> [u8; COLUMN_KEY_SIZE] {
    col.to_be_bytes()
}

/// Decode an 8-byte big-endian column key
pub fn decode_column(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; COLUMN_KEY_SIZE] = bytes.try_into().map_err(|_| {
        StoreError::Corrupted(format!(
            "column key must be {} bytes, got {}",
            COLUMN_KEY_SIZE,
            bytes.len()
        ))
    })?;
    Ok(u64::from_be_bytes(raw))
}
