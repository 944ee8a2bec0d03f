//! Bundle export.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use ledger_contracts::claim::ClaimStatus;
use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_contracts::event::{Event, EventType};
use ledger_core::traits::{ChainVerification, EventStore};

use crate::bundle::{BundleMeta, ClaimBundle, ClaimSummary, EditorKeyInfo, VerificationInfo};
use crate::bundle::{BUNDLE_VERSION, SPEC_VERSION};

/// Resolves editor identity facts needed for a bundle. Kept separate from
/// `ledger_core::traits::Projector` because the trust boundary around
/// command authorization only needs `is_active`/`public_key`, while a bundle
/// additionally needs `username` for a human-readable artifact.
pub trait EditorDirectory: Send + Sync {
    fn lookup(&self, editor_id: Uuid) -> LedgerResult<Option<EditorKeyInfo>>;
}

impl EditorDirectory for ledger_projector::InMemoryProjector {
    fn lookup(&self, editor_id: Uuid) -> LedgerResult<Option<EditorKeyInfo>> {
        Ok(self
            .editor(editor_id)?
            .map(|e| EditorKeyInfo { public_key: e.public_key, username: e.username }))
    }
}

fn derive_claim_status(events: &[Event]) -> ClaimStatus {
    let mut status = ClaimStatus::Declared;
    for event in events {
        status = match event.event_type {
            EventType::ClaimDeclared => ClaimStatus::Declared,
            EventType::ClaimOperationalized => ClaimStatus::Operationalized,
            EventType::EvidenceAdded if status == ClaimStatus::Operationalized => ClaimStatus::Observing,
            EventType::ClaimResolved => ClaimStatus::Resolved,
            _ => status,
        };
    }
    status
}

/// Builds a self-contained `ClaimBundle` for `claim_id`.
///
/// Fails with `UnknownEntity` if the claim has no events, or if any event's
/// `created_by` cannot be resolved through `editors` — an incomplete bundle
/// is refused at export time rather than shipped and discovered `INCOMPLETE`
/// later by a verifier.
pub fn export_bundle(
    store: &dyn EventStore,
    editors: &dyn EditorDirectory,
    claim_id: Uuid,
) -> LedgerResult<ClaimBundle> {
    let mut events = store.events_for_claim(claim_id)?;
    if events.is_empty() {
        return Err(LedgerError::UnknownEntity { kind: "claim".to_string(), id: claim_id.to_string() });
    }
    events.sort_by_key(|e| e.sequence_number);

    let status = derive_claim_status(&events);

    let mut editor_ids: HashSet<Uuid> = HashSet::new();
    for event in &events {
        editor_ids.insert(event.created_by);
    }

    let mut editor_keys: HashMap<Uuid, EditorKeyInfo> = HashMap::new();
    for editor_id in editor_ids {
        let info = editors.lookup(editor_id)?.ok_or_else(|| LedgerError::UnknownEntity {
            kind: "editor".to_string(),
            id: editor_id.to_string(),
        })?;
        editor_keys.insert(editor_id, info);
    }

    let chain_valid_at_export = matches!(store.verify_chain()?, ChainVerification::Intact {.. });

    Ok(ClaimBundle {
        meta: BundleMeta {
            bundle_version: BUNDLE_VERSION.to_string(),
            spec_version: SPEC_VERSION.to_string(),
            exported_at: chrono::Utc::now(),
            claim_id,
            chain_valid_at_export,
        },
        verification: VerificationInfo::default(),
        claim: ClaimSummary { claim_id, status, event_count: events.len() as u64 },
        events,
        editors: editor_keys,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ledger_store::InMemoryEventStore;
    use serde_json::json;

    use super::*;

    struct FixedDirectory(HashMap<Uuid, EditorKeyInfo>);

    impl EditorDirectory for FixedDirectory {
        fn lookup(&self, editor_id: Uuid) -> LedgerResult<Option<EditorKeyInfo>> {
            Ok(self.0.get(&editor_id).cloned())
        }
    }

    fn push(store: &InMemoryEventStore, claim_id: Uuid, editor_id: Uuid, sequence_number: u64, previous: Option<&str>, event_type: EventType) -> Event {
        let payload = json!({"n": sequence_number});
        let canonical = ledger_crypto::canonicalize(&payload).unwrap();
        let event_hash = ledger_crypto::event_hash(&canonical, previous);
        let event = Event {
            event_id: Uuid::new_v4(),
            sequence_number,
            event_type,
            claim_id: Some(claim_id),
            payload,
            previous_event_hash: previous.map(|s| s.to_string()),
            event_hash,
            created_by: editor_id,
            created_at: Utc::now(),
            editor_signature: "sig".to_string(),
        };
        store.append(event).unwrap()
    }

    #[test]
    fn export_bundle_includes_every_referenced_editor() {
        let store = InMemoryEventStore::new();
        let claim_id = Uuid::new_v4();
        let editor_id = Uuid::new_v4();

        let e0 = push(&store, claim_id, editor_id, 0, None, EventType::ClaimDeclared);
        push(&store, claim_id, editor_id, 1, Some(&e0.event_hash), EventType::ClaimOperationalized);

        let mut directory = HashMap::new();
        directory.insert(
            editor_id,
            EditorKeyInfo { public_key: "pk".to_string(), username: "jdoe".to_string() },
        );
        let editors = FixedDirectory(directory);

        let bundle = export_bundle(&store, &editors, claim_id).unwrap();
        assert_eq!(bundle.events.len(), 2);
        assert_eq!(bundle.claim.status, ClaimStatus::Operationalized);
        assert!(bundle.editors.contains_key(&editor_id));
    }

    #[test]
    fn export_bundle_fails_without_claim_events() {
        let store = InMemoryEventStore::new();
        let editors = FixedDirectory(HashMap::new());
        assert!(export_bundle(&store, &editors, Uuid::new_v4()).is_err());
    }

    #[test]
    fn export_bundle_fails_when_editor_key_is_missing() {
        let store = InMemoryEventStore::new();
        let claim_id = Uuid::new_v4();
        let editor_id = Uuid::new_v4();
        push(&store, claim_id, editor_id, 0, None, EventType::ClaimDeclared);

        let editors = FixedDirectory(HashMap::new());
        assert!(export_bundle(&store, &editors, claim_id).is_err());
    }
}
