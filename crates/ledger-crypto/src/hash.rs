//! SHA-256 event hashing.
//!
//! `event_hash` composes the canonical payload bytes with the previous
//! event's hash so that altering any earlier event invalidates every hash
//! that follows it.

use sha2::{Digest, Sha256};

/// Compute `event_hash` from canonical payload bytes and the previous
/// event's hash.
///
/// - `previous_event_hash = None` (sequence 0): `SHA256(canonical_bytes)`.
/// - `previous_event_hash = Some(h)`: `SHA256(lowercase_hex(h) || ":" || canonical_bytes)`.
///
/// Returns lowercase hex.
pub fn event_hash(canonical_bytes: &[u8], previous_event_hash: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = previous_event_hash {
        hasher.update(prev.to_lowercase().as_bytes());
        hasher.update(b":");
    }
    hasher.update(canonical_bytes);
    hex::encode(hasher.finalize())
}

/// Case-insensitive hex hash comparison.
pub fn hashes_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// SHA-256 of raw bytes, used by the Merkle tree for leaf/internal hashing
/// and available here so `ledger-anchor` does not need its own copy
/// of the primitive.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
