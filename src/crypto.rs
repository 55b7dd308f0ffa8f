//! Hashing primitives for PowChain

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Hex-encoded SHA-256 digest, always 64 lowercase characters.
pub type HexDigest = String;

/// Computes the SHA-256 digest of `data` and hex-encodes it.
pub fn sha256_hex(data: &[u8]) -> HexDigest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Returns true if `digest` starts with `difficulty` `'0'` characters.
///
/// A difficulty larger than the digest can never be met.
pub fn has_leading_zeros(digest: &str, difficulty: usize) -> bool {
    digest.len() >= difficulty && digest.bytes().take(difficulty).all(|b| b == b'0')
}
