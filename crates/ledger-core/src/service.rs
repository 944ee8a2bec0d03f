//! The ledger service: the deterministic, policy-bound command pipeline.
//!
//! The service enforces the ledger's execution model:
//!
//!   authorize → validate → lifecycle-check → [hash → sign → append]×(≤3) → project
//!
//! `EventStore::append` is only ever called after authorization, structural
//! validation, and the lifecycle check have all passed, and the projector is
//! only ever notified of events the store actually accepted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ledger_contracts::command::{AppendReceipt, LedgerCommand};
use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_contracts::event::{Event, EventType};

use crate::lifecycle::check_claim_transition;
use crate::traits::{EditorSigner, EventStore, Projector};

/// How many times `submit` retries a append that lost the race for the tail
/// before giving up and propagating `HashChainBroken`.
const MAX_APPEND_RETRIES: u32 = 3;

/// The central service that drives every write to the ledger.
///
/// Construct one `LedgerService` per ledger instance. It owns the trusted
/// components — store, projector, signer — and enforces the pipeline
/// ordering on every call to `submit`.
pub struct LedgerService {
    store: Arc<dyn EventStore>,
    projector: Arc<dyn Projector>,
    signer: Arc<dyn EditorSigner>,
    /// Pseudo-identity used for events not directly attributable to a human
    /// editor (genesis editor registration, automated anchoring
    /// bookkeeping). Bypasses the `editor_auth` lookup; the configured
    /// `EditorSigner` is expected to route this id to the system keypair.
    system_editor_id: Uuid,
    /// Set once `verify_chain` (or any caller) detects a broken hash chain.
    /// While set, `submit` short-circuits with `LedgerCorruption` until an
    /// operator calls `mark_recovered`.
    corrupted: AtomicBool,
    /// The sequence number at which corruption was last detected, for the
    /// `LedgerCorruption` error's context field.
    corrupted_at_sequence: AtomicU64,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn EventStore>,
        projector: Arc<dyn Projector>,
        signer: Arc<dyn EditorSigner>,
        system_editor_id: Uuid,
    ) -> Self {
        Self {
            store,
            projector,
            signer,
            system_editor_id,
            corrupted: AtomicBool::new(false),
            corrupted_at_sequence: AtomicU64::new(0),
        }
    }

    /// Run `command` through the full pipeline and append the resulting
    /// event, or fail without mutating anything.
    pub fn submit(&self, command: LedgerCommand) -> LedgerResult<AppendReceipt> {
        if self.corrupted.load(Ordering::SeqCst) {
            return Err(LedgerError::LedgerCorruption {
                sequence: self.corrupted_at_sequence.load(Ordering::SeqCst),
                reason: "ledger is latched after a detected hash chain break; call mark_recovered \
                         once the break has been investigated"
                    .to_string(),
            });
        }

        let (editor_id, claim_id, event_type, payload, registering_editor_id) = decompose(command)?;

        self.authorize(editor_id)?;

        if let Some(new_editor_id) = registering_editor_id {
            if self.projector.editor_auth(new_editor_id)?.is_some() {
                return Err(LedgerError::IllegalTransition {
                    reason: format!("editor {new_editor_id} is already registered; public keys are immutable"),
                });
            }
        }

        let current_status = match claim_id {
            Some(id) => self.projector.claim_status(id)?,
            None => None,
        };
        check_claim_transition(event_type, current_status)?;

        self.append_with_retry(editor_id, claim_id, event_type, payload)
    }

    fn authorize(&self, editor_id: Uuid) -> LedgerResult<()> {
        if editor_id == self.system_editor_id {
            return Ok(());
        }
        match self.projector.editor_auth(editor_id)? {
            Some(view) if view.is_active => Ok(()),
            Some(_) => Err(LedgerError::Unauthorized {
                reason: format!("editor {editor_id} has been deactivated"),
            }),
            None => Err(LedgerError::UnknownEntity {
                kind: "editor".to_string(),
                id: editor_id.to_string(),
            }),
        }
    }

    fn append_with_retry(
        &self,
        editor_id: Uuid,
        claim_id: Option<Uuid>,
        event_type: EventType,
        payload: Value,
    ) -> LedgerResult<AppendReceipt> {
        let canonical = ledger_crypto::canonicalize(&payload)?;

        for attempt in 0..MAX_APPEND_RETRIES {
            let tail = self.store.tail()?;
            let previous_event_hash = tail.as_ref().map(|e| e.event_hash.clone());
            let sequence_number = tail.as_ref().map(|e| e.sequence_number + 1).unwrap_or(0);

            let event_hash = ledger_crypto::event_hash(&canonical, previous_event_hash.as_deref());
            let editor_signature = self.signer.sign_for_editor(editor_id, &event_hash)?;

            let event = Event {
                event_id: Uuid::new_v4(),
                sequence_number,
                event_type,
                claim_id,
                payload: payload.clone(),
                previous_event_hash,
                event_hash: event_hash.clone(),
                created_by: editor_id,
                created_at: Utc::now(),
                editor_signature,
            };

            debug!(sequence_number, ?event_type, attempt, "appending event");

            match self.store.append(event) {
                Ok(stored) => {
                    self.projector.apply(&stored)?;
                    return Ok(AppendReceipt {
                        event_id: stored.event_id,
                        event_hash: stored.event_hash,
                        sequence_number: stored.sequence_number,
                    });
                }
                Err(LedgerError::HashChainBroken { expected, actual }) => {
                    warn!(
                        attempt,
                        expected, actual, "tail moved during append, retrying"
                    );
                    continue;
                }
                Err(other) => return Err(other),
            }
        }

        Err(LedgerError::HashChainBroken {
            expected: "stable tail".to_string(),
            actual: format!("tail kept moving across {MAX_APPEND_RETRIES} attempts"),
        })
    }

    /// Re-derive the full chain from storage. If a break is found, latch the
    /// service so further `submit` calls fail fast until an operator
    /// investigates and calls `mark_recovered`.
    pub fn verify_and_latch(&self) -> LedgerResult<crate::traits::ChainVerification> {
        let result = self.store.verify_chain()?;
        if let crate::traits::ChainVerification::Broken { sequence, ref reason } = result {
            warn!(sequence, reason, "hash chain break detected, latching ledger");
            self.corrupted_at_sequence.store(sequence, Ordering::SeqCst);
            self.corrupted.store(true, Ordering::SeqCst);
        }
        Ok(result)
    }

    /// Clear the corruption latch. Callers are responsible for having
    /// actually resolved the underlying break (or accepted the risk) before
    /// calling this.
    pub fn mark_recovered(&self) {
        info!("ledger corruption latch cleared by operator");
        self.corrupted.store(false, Ordering::SeqCst);
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted.load(Ordering::SeqCst)
    }
}

/// Break a `LedgerCommand` into the parts `submit` needs, validating the
/// payload along the way.
#[allow(clippy::type_complexity)]
fn decompose(
    command: LedgerCommand,
) -> LedgerResult<(Uuid, Option<Uuid>, EventType, Value, Option<Uuid>)> {
    use LedgerCommand::*;

    let (editor_id, claim_id, event_type, payload, registering_editor_id) = match command {
        DeclareClaim { claim_id, editor_id, payload } => {
            payload.validate()?;
            (editor_id, Some(claim_id), EventType::ClaimDeclared, serde_json::to_value(payload), None)
        }
        OperationalizeClaim { claim_id, editor_id, payload } => {
            payload.validate()?;
            (
                editor_id,
                Some(claim_id),
                EventType::ClaimOperationalized,
                serde_json::to_value(payload),
                None,
            )
        }
        AddEvidence { claim_id, editor_id, payload } => {
            payload.validate()?;
            (editor_id, Some(claim_id), EventType::EvidenceAdded, serde_json::to_value(payload), None)
        }
        ResolveClaim { claim_id, editor_id, payload } => {
            payload.validate()?;
            (editor_id, Some(claim_id), EventType::ClaimResolved, serde_json::to_value(payload), None)
        }
        RegisterEditor { editor_id, payload } => {
            payload.validate()?;
            let new_editor_id = payload.editor_id;
            (
                editor_id,
                None,
                EventType::EditorRegistered,
                serde_json::to_value(payload),
                Some(new_editor_id),
            )
        }
        DeactivateEditor { editor_id, payload } => {
            payload.validate()?;
            (editor_id, None, EventType::EditorDeactivated, serde_json::to_value(payload), None)
        }
    };

    let payload = payload.map_err(|e| LedgerError::ValidationError {
        reason: format!("failed to serialize payload: {e}"),
    })?;

    Ok((editor_id, claim_id, event_type, payload, registering_editor_id))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use ledger_contracts::claim::ClaimStatus;
    use ledger_contracts::payload::{ClaimDeclaredPayload, ClaimType, ScopeTriple};

    use crate::traits::{ChainVerification, EditorAuthView};

    use super::*;

    /// A trivial in-memory store good enough to exercise the service
    /// pipeline without pulling in `ledger-store` (which depends on
    /// `ledger-core`, so a real dependency here would be circular).
    struct FakeStore {
        events: Mutex<Vec<Event>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self { events: Mutex::new(Vec::new()) }
        }
    }

    impl EventStore for FakeStore {
        fn append(&self, event: Event) -> LedgerResult<Event> {
            let mut events = self.events.lock().unwrap();
            let expected_prev = events.last().map(|e| e.event_hash.clone());
            if event.previous_event_hash != expected_prev {
                return Err(LedgerError::HashChainBroken {
                    expected: expected_prev.unwrap_or_default(),
                    actual: event.previous_event_hash.clone().unwrap_or_default(),
                });
            }
            events.push(event.clone());
            Ok(event)
        }

        fn get(&self, event_id: Uuid) -> LedgerResult<Option<Event>> {
            Ok(self.events.lock().unwrap().iter().find(|e| e.event_id == event_id).cloned())
        }

        fn get_by_sequence(&self, sequence_number: u64) -> LedgerResult<Option<Event>> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.sequence_number == sequence_number)
                .cloned())
        }

        fn range(&self, from: u64, to: u64) -> LedgerResult<Vec<Event>> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.sequence_number >= from && e.sequence_number < to)
                .cloned()
                .collect())
        }

        fn tail(&self) -> LedgerResult<Option<Event>> {
            Ok(self.events.lock().unwrap().last().cloned())
        }

        fn count(&self) -> LedgerResult<u64> {
            Ok(self.events.lock().unwrap().len() as u64)
        }

        fn events_for_claim(&self, claim_id: Uuid) -> LedgerResult<Vec<Event>> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.claim_id == Some(claim_id))
                .cloned()
                .collect())
        }

        fn verify_chain(&self) -> LedgerResult<ChainVerification> {
            Ok(ChainVerification::Intact { checked: self.count()? })
        }
    }

    /// A fake projector that tracks claim statuses and editor auth state
    /// directly, sidestepping `ledger-projector`'s dispatch logic.
    struct FakeProjector {
        statuses: Mutex<HashMap<Uuid, ClaimStatus>>,
        editors: Mutex<HashMap<Uuid, EditorAuthView>>,
    }

    impl FakeProjector {
        fn new() -> Self {
            Self { statuses: Mutex::new(HashMap::new()), editors: Mutex::new(HashMap::new()) }
        }

        fn register(&self, editor_id: Uuid) {
            self.editors.lock().unwrap().insert(
                editor_id,
                EditorAuthView { is_active: true, public_key: "unused".to_string() },
            );
        }
    }

    impl Projector for FakeProjector {
        fn apply(&self, event: &Event) -> LedgerResult<()> {
            if event.event_type == EventType::ClaimDeclared {
                self.statuses
                    .lock()
                    .unwrap()
                    .insert(event.claim_id.unwrap(), ClaimStatus::Declared);
            }
            if event.event_type == EventType::EditorRegistered {
                let payload: ledger_contracts::payload::EditorRegisteredPayload =
                    serde_json::from_value(event.payload.clone()).unwrap();
                self.register(payload.editor_id);
            }
            Ok(())
        }

        fn last_applied_sequence(&self) -> LedgerResult<Option<u64>> {
            Ok(None)
        }

        fn reset(&self) -> LedgerResult<()> {
            self.statuses.lock().unwrap().clear();
            Ok(())
        }

        fn claim_status(&self, claim_id: Uuid) -> LedgerResult<Option<ClaimStatus>> {
            Ok(self.statuses.lock().unwrap().get(&claim_id).copied())
        }

        fn editor_auth(&self, editor_id: Uuid) -> LedgerResult<Option<EditorAuthView>> {
            Ok(self.editors.lock().unwrap().get(&editor_id).cloned())
        }
    }

    /// A signer that produces a deterministic fake signature — the service
    /// tests care about pipeline ordering and retries, not cryptography.
    struct FakeSigner;

    impl EditorSigner for FakeSigner {
        fn sign_for_editor(&self, editor_id: Uuid, event_hash_hex: &str) -> LedgerResult<String> {
            Ok(format!("sig:{editor_id}:{event_hash_hex}"))
        }
    }

    fn declare_claim_command(claim_id: Uuid, editor_id: Uuid) -> LedgerCommand {
        LedgerCommand::DeclareClaim {
            claim_id,
            editor_id,
            payload: ClaimDeclaredPayload {
                statement: "Median rent will fall within one year".to_string(),
                statement_context: None,
                source_url: None,
                claim_type: ClaimType::Predictive,
                scope: ScopeTriple {
                    subject: "Senator Example".to_string(),
                    jurisdiction: "federal".to_string(),
                    made_at: "2024-01-01".to_string(),
                },
            },
        }
    }

    fn make_service() -> (LedgerService, Uuid) {
        let store = Arc::new(FakeStore::new());
        let projector = Arc::new(FakeProjector::new());
        let editor_id = Uuid::new_v4();
        projector.register(editor_id);
        let service = LedgerService::new(store, projector, Arc::new(FakeSigner), Uuid::new_v4());
        (service, editor_id)
    }

    #[test]
    fn unknown_editor_is_rejected() {
        let (service, _) = make_service();
        let command = declare_claim_command(Uuid::new_v4(), Uuid::new_v4());
        match service.submit(command) {
            Err(LedgerError::UnknownEntity { kind, .. }) => assert_eq!(kind, "editor"),
            other => panic!("expected UnknownEntity, got {other:?}"),
        }
    }

    #[test]
    fn happy_path_declares_a_claim() {
        let (service, editor_id) = make_service();
        let claim_id = Uuid::new_v4();
        let receipt = service.submit(declare_claim_command(claim_id, editor_id)).unwrap();
        assert_eq!(receipt.sequence_number, 0);
    }

    #[test]
    fn declaring_twice_is_an_illegal_transition() {
        let (service, editor_id) = make_service();
        let claim_id = Uuid::new_v4();
        service.submit(declare_claim_command(claim_id, editor_id)).unwrap();
        match service.submit(declare_claim_command(claim_id, editor_id)) {
            Err(LedgerError::IllegalTransition {.. }) => {}
            other => panic!("expected IllegalTransition, got {other:?}"),
        }
    }

    #[test]
    fn registering_an_already_registered_editor_is_rejected() {
        let (service, editor_id) = make_service();
        let new_editor_id = Uuid::new_v4();
        let command = LedgerCommand::RegisterEditor {
            editor_id,
            payload: ledger_contracts::payload::EditorRegisteredPayload {
                editor_id: new_editor_id,
                username: "jdoe".to_string(),
                display_name: "Jane Doe".to_string(),
                role: "reporter".to_string(),
                public_key: "base64-key".to_string(),
            },
        };
        service.submit(command.clone()).unwrap();
        match service.submit(command) {
            Err(LedgerError::IllegalTransition {.. }) => {}
            other => panic!("expected IllegalTransition, got {other:?}"),
        }
    }

    #[test]
    fn corruption_latch_blocks_submit_until_recovered() {
        let (service, editor_id) = make_service();
        service.verify_and_latch().unwrap();
        // FakeStore always reports Intact, so force the latch directly to
        // exercise the short-circuit path deterministically.
        service.corrupted.store(true, Ordering::SeqCst);

        let result = service.submit(declare_claim_command(Uuid::new_v4(), editor_id));
        assert!(matches!(result, Err(LedgerError::LedgerCorruption {.. })));

        service.mark_recovered();
        assert!(service.submit(declare_claim_command(Uuid::new_v4(), editor_id)).is_ok());
    }
}
