use ring::digest::{Context, SHA256};
use serde::Serialize;

use crate::error::{BlockchainError, Result};
use crate::utils::serialization::to_canonical_json;
use data_encoding::HEXLOWER;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Io(format!("System time error: {e}")))?
        .as_millis();

    // Ensure the timestamp fits in i64
    if duration > i64::MAX as u128 {
        return Err(BlockchainError::Io("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA-256 of `data` as 64 lowercase hex characters.
pub fn sha256_hex(data: &[u8]) -> String {
    HEXLOWER.encode(&sha256_digest(data))
}

/// Hashes the canonical JSON form of `value`.
///
/// The string is produced by serde in struct declaration order, so callers
/// control key order by how they declare the hashed struct.
pub fn hash_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let canonical = to_canonical_json(value)?;
    Ok(sha256_hex(canonical.as_bytes()))
}
