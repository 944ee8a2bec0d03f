//! Editor identity types.
//!
//! Editors exist only as a fold over `EDITOR_REGISTERED` /
//! `EDITOR_DEACTIVATED` events — `Editor` here is the projected
//! read-model row, not a separately stored entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A role string attached to an editor at registration time. The ledger
/// core does not interpret roles beyond carrying them; editorial policy
/// (who may do what) is explicitly out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorRole(pub String);

/// The projected view of one editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Editor {
    pub editor_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: EditorRole,
    /// Base64-encoded Ed25519 public key. Immutable after registration.
    pub public_key: String,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
    pub registered_by: Uuid,
    pub deactivated_at: Option<DateTime<Utc>>,
}
