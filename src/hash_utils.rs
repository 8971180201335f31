//! Hash Utilities
//! Content digests used to fingerprint input and sanitized output
//! Author: kartik4091
//! Created: 2025-06-04

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a byte slice
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
