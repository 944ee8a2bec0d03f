//! Claim projection types.
//!
//! A `Claim` is never stored directly — it is the denormalized result of
//! folding a claim's events. The ledger core treats `status` as
//! the authoritative lifecycle position; `observing` is a pure view-model
//! state derived by the projector and never its own event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The lifecycle position of a claim:
/// `∅ → Declared → Operationalized → (Observing) → Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Declared,
    Operationalized,
    Observing,
    Resolved,
}

/// The denormalized, queryable view of one claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimView {
    pub claim_id: Uuid,
    pub status: ClaimStatus,
    /// Latest known statement text, set at CLAIM_DECLARED.
    pub statement: String,
    /// Latest known resolution, set only once CLAIM_RESOLVED has applied.
    pub resolution: Option<String>,
    pub evidence_count: u64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Sequence number of the most recently applied event for this claim,
    /// used by the projector to make handler application idempotent.
    pub last_sequence: u64,
}

/// The denormalized view of one piece of evidence attached to a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceView {
    pub evidence_id: Uuid,
    pub claim_id: Uuid,
    pub source_url: String,
    pub source_title: String,
    pub evidence_type: String,
    pub summary: String,
    pub supports_claim: bool,
    pub confidence_score: Option<String>,
    pub added_by: Uuid,
    pub added_at: DateTime<Utc>,
}
