//! The anchor service: batches newly appended events and answers inclusion
//! proof queries.

use uuid::Uuid;

use ledger_contracts::anchor::{AnchorBatch, AnchorStatus};
use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_core::traits::EventStore;

use crate::merkle::{Hash32, MerkleProof, MerkleTree};
use crate::store::AnchorBatchStore;

fn decode_event_hash(hex_hash: &str) -> LedgerResult<Hash32> {
    let bytes = hex::decode(hex_hash).map_err(|e| LedgerError::ValidationError {
        reason: format!("event_hash is not valid hex: {e}"),
    })?;
    bytes.try_into().map_err(|_| LedgerError::ValidationError {
        reason: "event_hash did not decode to 32 bytes".to_string(),
    })
}

/// Periodically batches contiguous, not-yet-anchored events into Merkle
/// trees and records the resulting root.
pub struct AnchorService {
    batch_size: usize,
}

impl AnchorService {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size: batch_size.max(1) }
    }

    /// Selects the next contiguous unclosed range (up to `batch_size`
    /// events), builds its Merkle tree, and records a `pending` batch.
    /// Returns `None` if there are no new events to batch.
    pub fn run_once(
        &self,
        store: &dyn EventStore,
        registry: &dyn AnchorBatchStore,
    ) -> LedgerResult<Option<AnchorBatch>> {
        let total = store.count()?;
        let start = registry.latest_end_sequence()?.map(|e| e + 1).unwrap_or(0);
        if start >= total {
            return Ok(None);
        }

        let end_exclusive = total.min(start + self.batch_size as u64);
        let events = store.range(start, end_exclusive)?;
        if events.is_empty() {
            return Ok(None);
        }

        let leaves = events
            .iter()
            .map(|e| decode_event_hash(&e.event_hash))
            .collect::<LedgerResult<Vec<_>>>()?;
        let tree = MerkleTree::build(leaves)?;

        let batch = AnchorBatch {
            batch_id: Uuid::new_v4(),
            start_sequence: start,
            end_sequence: events.last().expect("checked non-empty above").sequence_number,
            merkle_root: hex::encode(tree.root()),
            status: AnchorStatus::Pending,
            external_reference: None,
        };
        tracing::info!(
            batch_id = %batch.batch_id,
            start = batch.start_sequence,
            end = batch.end_sequence,
            "recorded anchor batch"
        );
        registry.insert(batch).map(Some)
    }

    pub fn mark_anchored(
        &self,
        registry: &dyn AnchorBatchStore,
        batch_id: Uuid,
        external_reference: String,
    ) -> LedgerResult<AnchorBatch> {
        registry.update_status(batch_id, AnchorStatus::Anchored, Some(external_reference))
    }

    pub fn mark_failed(&self, registry: &dyn AnchorBatchStore, batch_id: Uuid) -> LedgerResult<AnchorBatch> {
        registry.update_status(batch_id, AnchorStatus::Failed, None)
    }

    /// Rebuilds the batch containing `event_id`'s tree and returns the
    /// sibling proof for that event's leaf.
    pub fn inclusion_proof(
        &self,
        store: &dyn EventStore,
        registry: &dyn AnchorBatchStore,
        event_id: Uuid,
    ) -> LedgerResult<MerkleProof> {
        let event = store.get(event_id)?.ok_or_else(|| LedgerError::UnknownEntity {
            kind: "event".to_string(),
            id: event_id.to_string(),
        })?;
        let batch = registry.batch_containing(event.sequence_number)?.ok_or_else(|| {
            LedgerError::UnknownEntity { kind: "anchor_batch".to_string(), id: event_id.to_string() }
        })?;

        let events = store.range(batch.start_sequence, batch.end_sequence + 1)?;
        let leaves = events
            .iter()
            .map(|e| decode_event_hash(&e.event_hash))
            .collect::<LedgerResult<Vec<_>>>()?;
        let tree = MerkleTree::build(leaves)?;

        let leaf_index = (event.sequence_number - batch.start_sequence) as usize;
        tree.proof(leaf_index)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ledger_contracts::event::{Event, EventType};
    use ledger_store::InMemoryEventStore;
    use serde_json::json;

    use super::*;
    use crate::store::InMemoryAnchorStore;

    fn push_events(store: &InMemoryEventStore, count: usize) {
        let mut previous_event_hash: Option<String> = None;
        for i in 0..count {
            let payload = json!({"n": i});
            let canonical = ledger_crypto::canonicalize(&payload).unwrap();
            let event_hash = ledger_crypto::event_hash(&canonical, previous_event_hash.as_deref());
            let event = Event {
                event_id: Uuid::new_v4(),
                sequence_number: i as u64,
                event_type: EventType::ClaimDeclared,
                claim_id: Some(Uuid::new_v4()),
                payload,
                previous_event_hash: previous_event_hash.clone(),
                event_hash: event_hash.clone(),
                created_by: Uuid::new_v4(),
                created_at: Utc::now(),
                editor_signature: "sig".to_string(),
            };
            store.append(event).unwrap();
            previous_event_hash = Some(event_hash);
        }
    }

    #[test]
    fn batches_events_and_advances_past_already_anchored_ranges() {
        let store = InMemoryEventStore::new();
        push_events(&store, 5);
        let registry = InMemoryAnchorStore::new();
        let service = AnchorService::new(3);

        let first = service.run_once(&store, &registry).unwrap().unwrap();
        assert_eq!((first.start_sequence, first.end_sequence), (0, 2));

        let second = service.run_once(&store, &registry).unwrap().unwrap();
        assert_eq!((second.start_sequence, second.end_sequence), (3, 4));

        assert!(service.run_once(&store, &registry).unwrap().is_none());
    }

    #[test]
    fn inclusion_proof_verifies_against_batch_root() {
        let store = InMemoryEventStore::new();
        push_events(&store, 5);
        let registry = InMemoryAnchorStore::new();
        let service = AnchorService::new(5);

        let batch = service.run_once(&store, &registry).unwrap().unwrap();
        let event = store.get_by_sequence(2).unwrap().unwrap();
        let proof = service.inclusion_proof(&store, &registry, event.event_id).unwrap();

        let leaf = decode_event_hash(&event.event_hash).unwrap();
        let root = decode_event_hash(&batch.merkle_root).unwrap();
        assert!(proof.verify(leaf, root));
    }

    #[test]
    fn mark_anchored_records_external_reference() {
        let store = InMemoryEventStore::new();
        push_events(&store, 2);
        let registry = InMemoryAnchorStore::new();
        let service = AnchorService::new(10);

        let batch = service.run_once(&store, &registry).unwrap().unwrap();
        let updated = service.mark_anchored(&registry, batch.batch_id, "git:tag:v1".to_string()).unwrap();
        assert_eq!(updated.status, AnchorStatus::Anchored);
        assert_eq!(updated.external_reference.as_deref(), Some("git:tag:v1"));
    }
}
