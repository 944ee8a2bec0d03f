//! Anchor batch types.
//!
//! An anchor batch is a Merkle root covering a contiguous range of events,
//! published to an external witness. Batches are append-only rows derived
//! from the event stream; they are never rebuilt from events the way
//! projections are, since publication is a one-way, externally-witnessed act.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The publication state of an anchor batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStatus {
    Pending,
    Anchored,
    Failed,
}

/// A Merkle root covering `[start_sequence, end_sequence]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorBatch {
    pub batch_id: Uuid,
    pub start_sequence: u64,
    pub end_sequence: u64,
    /// Lowercase hex SHA-256 Merkle root over the batch's event hashes.
    pub merkle_root: String,
    pub status: AnchorStatus,
    /// Opaque reference to the external witness (git tag, blockchain txid,
    /// S3 object version, ...). Populated when `status == Anchored`.
    pub external_reference: Option<String>,
}
