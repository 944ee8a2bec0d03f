//! # ledger-anchor
//!
//! Merkle batching of the event stream and inclusion proof issuance.

pub mod merkle;
pub mod service;
pub mod store;

pub use merkle::{Hash32, MerkleProof, MerkleTree, Position};
pub use service::AnchorService;
pub use store::{AnchorBatchStore, InMemoryAnchorStore};
