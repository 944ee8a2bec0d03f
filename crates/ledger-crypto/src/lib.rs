//! # ledger-crypto
//!
//! Canonicalization, hashing, and Ed25519 signing primitives used to build
//! and verify the event hash chain. No storage or lifecycle
//! logic lives here.

pub mod canon;
pub mod hash;
pub mod sign;

pub use canon::{canonical_value, canonicalize, parse as parse_canonical};
pub use hash::{event_hash, hashes_equal, sha256};
pub use sign::{verify as verify_signature, Keypair, SystemKeypair};
