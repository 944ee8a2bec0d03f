//! The in-memory read-model projector.
//!
//! `InMemoryProjector` folds the event stream into three maps — claims,
//! editors, evidence — behind one `RwLock`, so readers (the query layer)
//! never block each other and the single writer (`LedgerService`'s
//! synchronous `apply` call after every append) never blocks a reader for
//! longer than a map mutation. Dispatch is a simple match on `event_type`
//! to one handler function per event kind.
//!
//! Every handler is idempotent: it checks `event.sequence_number` against
//! the claim's `last_sequence` before mutating, so replaying an event that
//! was already applied is a no-op.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use ledger_contracts::claim::{ClaimStatus, ClaimView, EvidenceView};
use ledger_contracts::editor::{Editor, EditorRole};
use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_contracts::event::{Event, EventType};
use ledger_contracts::payload::{
    ClaimDeclaredPayload, ClaimResolvedPayload, EditorDeactivatedPayload, EditorRegisteredPayload,
    EvidenceAddedPayload,
};
use ledger_core::traits::{EditorAuthView, Projector};

struct ProjectionState {
    claims: HashMap<Uuid, ClaimView>,
    editors: HashMap<Uuid, Editor>,
    evidence: HashMap<Uuid, Vec<EvidenceView>>,
    last_applied_sequence: Option<u64>,
}

impl ProjectionState {
    fn new() -> Self {
        Self {
            claims: HashMap::new(),
            editors: HashMap::new(),
            evidence: HashMap::new(),
            last_applied_sequence: None,
        }
    }
}

/// The reference `Projector` implementation, and the source of truth for
/// `LedgerQuery`'s read methods.
pub struct InMemoryProjector {
    state: RwLock<ProjectionState>,
}

impl InMemoryProjector {
    pub fn new() -> Self {
        Self { state: RwLock::new(ProjectionState::new()) }
    }

    fn read(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, ProjectionState>> {
        self.state.read().map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("projection lock poisoned: {e}"),
        })
    }

    fn write(&self) -> LedgerResult<std::sync::RwLockWriteGuard<'_, ProjectionState>> {
        self.state.write().map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("projection lock poisoned: {e}"),
        })
    }

    pub fn claim_view(&self, claim_id: Uuid) -> LedgerResult<Option<ClaimView>> {
        Ok(self.read()?.claims.get(&claim_id).cloned())
    }

    pub fn list_claim_views(&self) -> LedgerResult<Vec<ClaimView>> {
        Ok(self.read()?.claims.values().cloned().collect())
    }

    pub fn evidence_for_claim(&self, claim_id: Uuid) -> LedgerResult<Vec<EvidenceView>> {
        Ok(self.read()?.evidence.get(&claim_id).cloned().unwrap_or_default())
    }

    pub fn editor(&self, editor_id: Uuid) -> LedgerResult<Option<Editor>> {
        Ok(self.read()?.editors.get(&editor_id).cloned())
    }

    pub fn list_editors(&self) -> LedgerResult<Vec<Editor>> {
        Ok(self.read()?.editors.values().cloned().collect())
    }
}

impl Default for InMemoryProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl Projector for InMemoryProjector {
    fn apply(&self, event: &Event) -> LedgerResult<()> {
        let mut state = self.write()?;

        match event.event_type {
            EventType::ClaimDeclared => apply_claim_declared(&mut state, event)?,
            EventType::ClaimOperationalized => apply_status_only(&mut state, event, ClaimStatus::Operationalized)?,
            EventType::EvidenceAdded => apply_evidence_added(&mut state, event)?,
            EventType::ClaimResolved => apply_claim_resolved(&mut state, event)?,
            EventType::EditorRegistered => apply_editor_registered(&mut state, event)?,
            EventType::EditorDeactivated => apply_editor_deactivated(&mut state, event)?,
        }

        state.last_applied_sequence = Some(
            state.last_applied_sequence.map_or(event.sequence_number, |s| s.max(event.sequence_number)),
        );
        Ok(())
    }

    fn last_applied_sequence(&self) -> LedgerResult<Option<u64>> {
        Ok(self.read()?.last_applied_sequence)
    }

    fn reset(&self) -> LedgerResult<()> {
        let mut state = self.write()?;
        *state = ProjectionState::new();
        Ok(())
    }

    fn claim_status(&self, claim_id: Uuid) -> LedgerResult<Option<ClaimStatus>> {
        Ok(self.read()?.claims.get(&claim_id).map(|c| c.status))
    }

    fn editor_auth(&self, editor_id: Uuid) -> LedgerResult<Option<EditorAuthView>> {
        Ok(self.read()?.editors.get(&editor_id).map(|e| EditorAuthView {
            is_active: e.is_active,
            public_key: e.public_key.clone(),
        }))
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(event: &Event) -> LedgerResult<T> {
    serde_json::from_value(event.payload.clone()).map_err(|e| LedgerError::ValidationError {
        reason: format!("failed to decode {} payload: {e}", event_type_name(event.event_type)),
    })
}

fn event_type_name(event_type: EventType) -> &'static str {
    match event_type {
        EventType::ClaimDeclared => "CLAIM_DECLARED",
        EventType::ClaimOperationalized => "CLAIM_OPERATIONALIZED",
        EventType::EvidenceAdded => "EVIDENCE_ADDED",
        EventType::ClaimResolved => "CLAIM_RESOLVED",
        EventType::EditorRegistered => "EDITOR_REGISTERED",
        EventType::EditorDeactivated => "EDITOR_DEACTIVATED",
    }
}

fn apply_claim_declared(state: &mut ProjectionState, event: &Event) -> LedgerResult<()> {
    let claim_id = event.claim_id.ok_or_else(|| LedgerError::ValidationError {
        reason: "CLAIM_DECLARED event is missing claim_id".to_string(),
    })?;
    if state.claims.contains_key(&claim_id) {
        return Ok(()); // already applied
    }
    let payload: ClaimDeclaredPayload = parse_payload(event)?;
    state.claims.insert(
        claim_id,
        ClaimView {
            claim_id,
            status: ClaimStatus::Declared,
            statement: payload.statement,
            resolution: None,
            evidence_count: 0,
            created_by: event.created_by,
            created_at: event.created_at,
            last_updated: event.created_at,
            resolved_at: None,
            last_sequence: event.sequence_number,
        },
    );
    Ok(())
}

fn apply_status_only(
    state: &mut ProjectionState,
    event: &Event,
    new_status: ClaimStatus,
) -> LedgerResult<()> {
    let claim_id = event.claim_id.ok_or_else(|| LedgerError::ValidationError {
        reason: format!("{} event is missing claim_id", event_type_name(event.event_type)),
    })?;
    let Some(view) = state.claims.get_mut(&claim_id) else {
        return Err(LedgerError::UnknownEntity { kind: "claim".to_string(), id: claim_id.to_string() });
    };
    if event.sequence_number <= view.last_sequence {
        return Ok(());
    }
    view.status = new_status;
    view.last_updated = event.created_at;
    view.last_sequence = event.sequence_number;
    Ok(())
}

fn apply_evidence_added(state: &mut ProjectionState, event: &Event) -> LedgerResult<()> {
    let claim_id = event.claim_id.ok_or_else(|| LedgerError::ValidationError {
        reason: "EVIDENCE_ADDED event is missing claim_id".to_string(),
    })?;
    let Some(view) = state.claims.get_mut(&claim_id) else {
        return Err(LedgerError::UnknownEntity { kind: "claim".to_string(), id: claim_id.to_string() });
    };
    if event.sequence_number <= view.last_sequence {
        return Ok(());
    }

    let payload: EvidenceAddedPayload = parse_payload(event)?;
    state.evidence.entry(claim_id).or_default().push(EvidenceView {
        evidence_id: event.event_id,
        claim_id,
        source_url: payload.source_url,
        source_title: payload.source_title,
        evidence_type: payload.evidence_type,
        summary: payload.summary,
        supports_claim: payload.supports_claim,
        confidence_score: payload.confidence_score,
        added_by: event.created_by,
        added_at: event.created_at,
    });

    let view = state.claims.get_mut(&claim_id).expect("checked above");
    if view.status == ClaimStatus::Operationalized {
        view.status = ClaimStatus::Observing;
    }
    view.evidence_count += 1;
    view.last_updated = event.created_at;
    view.last_sequence = event.sequence_number;
    Ok(())
}

fn apply_claim_resolved(state: &mut ProjectionState, event: &Event) -> LedgerResult<()> {
    let claim_id = event.claim_id.ok_or_else(|| LedgerError::ValidationError {
        reason: "CLAIM_RESOLVED event is missing claim_id".to_string(),
    })?;
    let Some(view) = state.claims.get_mut(&claim_id) else {
        return Err(LedgerError::UnknownEntity { kind: "claim".to_string(), id: claim_id.to_string() });
    };
    if event.sequence_number <= view.last_sequence {
        return Ok(());
    }

    let payload: ClaimResolvedPayload = parse_payload(event)?;
    view.status = ClaimStatus::Resolved;
    view.resolution = Some(payload.resolution_summary);
    view.resolved_at = Some(event.created_at);
    view.last_updated = event.created_at;
    view.last_sequence = event.sequence_number;
    Ok(())
}

fn apply_editor_registered(state: &mut ProjectionState, event: &Event) -> LedgerResult<()> {
    let payload: EditorRegisteredPayload = parse_payload(event)?;
    if state.editors.contains_key(&payload.editor_id) {
        return Ok(()); // already applied, or LedgerService's uniqueness check was bypassed by a direct replay
    }
    state.editors.insert(
        payload.editor_id,
        Editor {
            editor_id: payload.editor_id,
            username: payload.username,
            display_name: payload.display_name,
            role: EditorRole(payload.role),
            public_key: payload.public_key,
            is_active: true,
            registered_at: event.created_at,
            registered_by: event.created_by,
            deactivated_at: None,
        },
    );
    Ok(())
}

fn apply_editor_deactivated(state: &mut ProjectionState, event: &Event) -> LedgerResult<()> {
    let payload: EditorDeactivatedPayload = parse_payload(event)?;
    let Some(editor) = state.editors.get_mut(&payload.editor_id) else {
        return Err(LedgerError::UnknownEntity {
            kind: "editor".to_string(),
            id: payload.editor_id.to_string(),
        });
    };
    editor.is_active = false;
    editor.deactivated_at = Some(event.created_at);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ledger_contracts::payload::{ClaimType, Resolution, ScopeTriple};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn declared_event(claim_id: Uuid, sequence_number: u64) -> Event {
        let payload = ClaimDeclaredPayload {
            statement: "Median rent will fall within one year".to_string(),
            statement_context: None,
            source_url: None,
            claim_type: ClaimType::Predictive,
            scope: ScopeTriple {
                subject: "Senator Example".to_string(),
                jurisdiction: "federal".to_string(),
                made_at: "2024-01-01".to_string(),
            },
        };
        Event {
            event_id: Uuid::new_v4(),
            sequence_number,
            event_type: EventType::ClaimDeclared,
            claim_id: Some(claim_id),
            payload: serde_json::to_value(payload).unwrap(),
            previous_event_hash: None,
            event_hash: "hash".to_string(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            editor_signature: "sig".to_string(),
        }
    }

    #[test]
    fn declare_then_query_claim() {
        let projector = InMemoryProjector::new();
        let claim_id = Uuid::new_v4();
        projector.apply(&declared_event(claim_id, 0)).unwrap();

        let view = projector.claim_view(claim_id).unwrap().unwrap();
        assert_eq!(view.status, ClaimStatus::Declared);
        assert_eq!(view.evidence_count, 0);
    }

    #[test]
    fn replaying_the_same_event_is_a_no_op() {
        let projector = InMemoryProjector::new();
        let claim_id = Uuid::new_v4();
        let event = declared_event(claim_id, 0);
        projector.apply(&event).unwrap();
        projector.apply(&event).unwrap();
        assert_eq!(projector.list_claim_views().unwrap().len(), 1);
    }

    #[test]
    fn evidence_then_resolution_updates_view() {
        let projector = InMemoryProjector::new();
        let claim_id = Uuid::new_v4();
        projector.apply(&declared_event(claim_id, 0)).unwrap();

        let mut operationalized = declared_event(claim_id, 1);
        operationalized.event_type = EventType::ClaimOperationalized;
        operationalized.payload = json!({});
        projector.apply(&operationalized).unwrap();

        let mut evidence = declared_event(claim_id, 2);
        evidence.event_type = EventType::EvidenceAdded;
        evidence.payload = serde_json::to_value(EvidenceAddedPayload {
            source_url: "https://example.com/report".to_string(),
            source_title: "Annual housing report".to_string(),
            publisher: None,
            published_date: None,
            source_type: "report".to_string(),
            evidence_type: "statistic".to_string(),
            summary: "Median rent fell 3% year over year.".to_string(),
            supports_claim: true,
            confidence_score: Some("0.8".to_string()),
        })
        .unwrap();
        projector.apply(&evidence).unwrap();
        assert_eq!(projector.claim_view(claim_id).unwrap().unwrap().status, ClaimStatus::Observing);

        let mut resolved = declared_event(claim_id, 3);
        resolved.event_type = EventType::ClaimResolved;
        resolved.payload = serde_json::to_value(ClaimResolvedPayload {
            resolution: Resolution::Met,
            resolution_summary: "Median rent fell below target by year end.".to_string(),
            supporting_evidence_ids: vec![evidence.event_id],
            resolution_details: None,
        })
        .unwrap();
        projector.apply(&resolved).unwrap();

        let view = projector.claim_view(claim_id).unwrap().unwrap();
        assert_eq!(view.status, ClaimStatus::Resolved);
        assert_eq!(view.evidence_count, 1);
        assert!(view.resolution.unwrap().contains("Median rent"));
        assert!(view.resolved_at.is_some());
    }

    #[test]
    fn editor_registration_and_deactivation() {
        let projector = InMemoryProjector::new();
        let editor_id = Uuid::new_v4();
        let mut registered = declared_event(Uuid::new_v4(), 0);
        registered.event_type = EventType::EditorRegistered;
        registered.claim_id = None;
        registered.payload = serde_json::to_value(EditorRegisteredPayload {
            editor_id,
            username: "jdoe".to_string(),
            display_name: "Jane Doe".to_string(),
            role: "reporter".to_string(),
            public_key: "base64-key".to_string(),
        })
        .unwrap();
        projector.apply(&registered).unwrap();

        assert!(projector.editor_auth(editor_id).unwrap().unwrap().is_active);

        let mut deactivated = declared_event(Uuid::new_v4(), 1);
        deactivated.event_type = EventType::EditorDeactivated;
        deactivated.claim_id = None;
        deactivated.payload = serde_json::to_value(EditorDeactivatedPayload {
            editor_id,
            reason: Some("left the organization".to_string()),
        })
        .unwrap();
        projector.apply(&deactivated).unwrap();

        assert!(!projector.editor_auth(editor_id).unwrap().unwrap().is_active);
    }
}
