//! Ingress commands: the six operations adapters may submit to the
//! ledger service. Each variant pairs a validated payload with the
//! authenticated editor performing the action.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payload::{
    ClaimDeclaredPayload, ClaimOperationalizedPayload, ClaimResolvedPayload,
    EditorDeactivatedPayload, EditorRegisteredPayload, EvidenceAddedPayload,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerCommand {
    DeclareClaim {
        claim_id: Uuid,
        editor_id: Uuid,
        payload: ClaimDeclaredPayload,
    },
    OperationalizeClaim {
        claim_id: Uuid,
        editor_id: Uuid,
        payload: ClaimOperationalizedPayload,
    },
    AddEvidence {
        claim_id: Uuid,
        editor_id: Uuid,
        payload: EvidenceAddedPayload,
    },
    ResolveClaim {
        claim_id: Uuid,
        editor_id: Uuid,
        payload: ClaimResolvedPayload,
    },
    RegisterEditor {
        /// The editor performing the registration.
        editor_id: Uuid,
        payload: EditorRegisteredPayload,
    },
    DeactivateEditor {
        editor_id: Uuid,
        payload: EditorDeactivatedPayload,
    },
}

/// Returned by `LedgerService::submit` on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendReceipt {
    pub event_id: Uuid,
    pub event_hash: String,
    pub sequence_number: u64,
}
