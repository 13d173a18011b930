//! Hashing helpers for address handling
//!
//! This module provides:
//! - Keccak-256 hashing (pre-standard SHA-3, as used by Ethereum)
//! - EIP-55 mixed-case checksum encoding and verification

use sha3::{Digest, Keccak256};

/// Keccak-256 digest of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// EIP-55 checksummed hex form of a 20-byte address, `0x`-prefixed
pub fn to_checksum(bytes: &[u8; 20]) -> String {
    let lower = hex::encode(bytes);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Check a 40-char hex body against its checksum.
///
/// All-lowercase and all-uppercase bodies carry no checksum and always pass.
pub fn verify_checksum(body: &str, bytes: &[u8; 20]) -> bool {
    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }
    to_checksum(bytes)[2..] == *body
}
