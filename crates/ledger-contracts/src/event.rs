//! The event: the atomic, immutable unit of the ledger.
//!
//! Every fact the system knows is an `Event`. Events are never updated or
//! deleted; projections and anchor batches are derived
//! caches rebuildable from the event stream alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The six event types recognized by the ledger. Dispatch on this
/// discriminant is exhaustive everywhere (canonicalizer excluded — it is
/// agnostic to event_type) so adding a new type is a compile error until
/// every match arm is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    ClaimDeclared,
    ClaimOperationalized,
    EvidenceAdded,
    ClaimResolved,
    EditorRegistered,
    EditorDeactivated,
}

impl EventType {
    /// True for event types that carry a `claim_id`.
    pub fn is_claim_related(self) -> bool {
        !matches!(self, EventType::EditorRegistered | EventType::EditorDeactivated)
    }
}

/// A single entry in the append-only ledger.
///
/// `event_hash` commits to `(payload, previous_event_hash)`;
/// `editor_signature` commits to the raw bytes of `event_hash`, not its hex
/// string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Opaque 128-bit identifier, unique across the ledger.
    pub event_id: Uuid,
    /// Monotonic, gap-free position in the ledger, starting at 0.
    pub sequence_number: u64,
    /// The kind of fact this event records.
    pub event_type: EventType,
    /// Required for claim-related event types; `None` for editor events.
    pub claim_id: Option<Uuid>,
    /// Domain payload. The ledger core validates required fields but is
    /// agnostic to what claims mean.
    pub payload: serde_json::Value,
    /// Lowercase hex SHA-256 of the previous event, or `None` at sequence 0.
    pub previous_event_hash: Option<String>,
    /// Lowercase hex SHA-256 of `(payload, previous_event_hash)`.
    pub event_hash: String,
    /// The editor (or the system keypair) that authored this event.
    pub created_by: Uuid,
    /// UTC timestamp, microsecond precision.
    pub created_at: DateTime<Utc>,
    /// Base64 Ed25519 signature over the raw 32 bytes of `event_hash`.
    pub editor_signature: String,
}

/// Sentinel string used in place of a `previous_event_hash` when reasoning
/// about the chain before the genesis event exists. Never stored — genesis
/// events store `previous_event_hash: None`.
pub const GENESIS_SENTINEL: &str = "<genesis>";
