//! The claim bundle shape: a self-contained artifact a verifier with
//! no access to the ledger can check on its own.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledger_contracts::claim::ClaimStatus;
use ledger_contracts::event::Event;

pub const BUNDLE_VERSION: &str = "1";
pub const SPEC_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMeta {
    pub bundle_version: String,
    pub spec_version: String,
    pub exported_at: DateTime<Utc>,
    pub claim_id: Uuid,
    /// Whether `EventStore::verify_chain` reported the chain intact at the
    /// moment of export. A bundle exported from a known-corrupt ledger still
    /// carries this flag so a verifier isn't misled by a later claim of
    /// integrity.
    pub chain_valid_at_export: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationInfo {
    pub canonicalization_version: u32,
    pub hash_algorithm: String,
    pub signature_algorithm: String,
}

impl Default for VerificationInfo {
    fn default() -> Self {
        Self {
            canonicalization_version: 1,
            hash_algorithm: "SHA-256".to_string(),
            signature_algorithm: "Ed25519".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub claim_id: Uuid,
    pub status: ClaimStatus,
    pub event_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorKeyInfo {
    pub public_key: String,
    pub username: String,
}

/// A self-contained, independently verifiable record of one claim's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimBundle {
    #[serde(rename = "_meta")]
    pub meta: BundleMeta,
    #[serde(rename = "_verification")]
    pub verification: VerificationInfo,
    pub claim: ClaimSummary,
    pub events: Vec<Event>,
    pub editors: HashMap<Uuid, EditorKeyInfo>,
}
