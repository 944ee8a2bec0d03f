//! In-memory implementation of `EventStore`.
//!
//! `InMemoryEventStore` is the reference implementation: all events live in
//! a `Vec` behind a `Mutex`, alongside two index maps for O(1) lookup by
//! `event_id` and by `claim_id`. `append` detects a moved tail itself and
//! rejects rather than assuming its caller always supplies the correct
//! `previous_event_hash`.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_contracts::event::Event;
use ledger_core::traits::{ChainVerification, EventStore};

struct InMemoryState {
    events: Vec<Event>,
    by_event_id: HashMap<Uuid, usize>,
    by_claim_id: HashMap<Uuid, Vec<usize>>,
}

impl InMemoryState {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            by_event_id: HashMap::new(),
            by_claim_id: HashMap::new(),
        }
    }
}

/// An in-memory, append-only event store. Suitable for tests, the CLI demo,
/// and any deployment that accepts losing the ledger on process exit.
pub struct InMemoryEventStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self { state: Mutex::new(InMemoryState::new()) }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: Event) -> LedgerResult<Event> {
        let mut state = self.state.lock().map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("in-memory store lock poisoned: {e}"),
        })?;

        if state.by_event_id.contains_key(&event.event_id) {
            return Err(LedgerError::DuplicateEventId { event_id: event.event_id.to_string() });
        }

        let expected_prev = state.events.last().map(|e| e.event_hash.clone());
        if event.previous_event_hash != expected_prev {
            return Err(LedgerError::HashChainBroken {
                expected: expected_prev.unwrap_or_default(),
                actual: event.previous_event_hash.clone().unwrap_or_default(),
            });
        }

        let expected_sequence = state.events.len() as u64;
        if event.sequence_number != expected_sequence {
            return Err(LedgerError::HashChainBroken {
                expected: expected_sequence.to_string(),
                actual: event.sequence_number.to_string(),
            });
        }

        let index = state.events.len();
        state.by_event_id.insert(event.event_id, index);
        if let Some(claim_id) = event.claim_id {
            state.by_claim_id.entry(claim_id).or_default().push(index);
        }
        state.events.push(event.clone());

        Ok(event)
    }

    fn get(&self, event_id: Uuid) -> LedgerResult<Option<Event>> {
        let state = self.lock()?;
        Ok(state.by_event_id.get(&event_id).map(|&i| state.events[i].clone()))
    }

    fn get_by_sequence(&self, sequence_number: u64) -> LedgerResult<Option<Event>> {
        let state = self.lock()?;
        Ok(state.events.get(sequence_number as usize).cloned())
    }

    fn range(&self, from: u64, to: u64) -> LedgerResult<Vec<Event>> {
        let state = self.lock()?;
        let from = from as usize;
        let to = (to as usize).min(state.events.len());
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(state.events[from..to].to_vec())
    }

    fn tail(&self) -> LedgerResult<Option<Event>> {
        let state = self.lock()?;
        Ok(state.events.last().cloned())
    }

    fn count(&self) -> LedgerResult<u64> {
        Ok(self.lock()?.events.len() as u64)
    }

    fn events_for_claim(&self, claim_id: Uuid) -> LedgerResult<Vec<Event>> {
        let state = self.lock()?;
        Ok(state
            .by_claim_id
            .get(&claim_id)
            .map(|indices| indices.iter().map(|&i| state.events[i].clone()).collect())
            .unwrap_or_default())
    }

    fn verify_chain(&self) -> LedgerResult<ChainVerification> {
        let state = self.lock()?;
        let mut expected_prev: Option<String> = None;

        for event in &state.events {
            if event.previous_event_hash != expected_prev {
                return Ok(ChainVerification::Broken {
                    sequence: event.sequence_number,
                    reason: format!(
                        "previous_event_hash mismatch: expected {:?}, stored {:?}",
                        expected_prev, event.previous_event_hash
                    ),
                });
            }

            let canonical = ledger_crypto::canonicalize(&event.payload)?;
            let recomputed = ledger_crypto::event_hash(&canonical, expected_prev.as_deref());
            if !ledger_crypto::hashes_equal(&recomputed, &event.event_hash) {
                return Ok(ChainVerification::Broken {
                    sequence: event.sequence_number,
                    reason: format!(
                        "event_hash mismatch: recomputed {recomputed}, stored {}",
                        event.event_hash
                    ),
                });
            }

            expected_prev = Some(event.event_hash.clone());
        }

        Ok(ChainVerification::Intact { checked: state.events.len() as u64 })
    }
}

impl InMemoryEventStore {
    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, InMemoryState>> {
        self.state.lock().map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("in-memory store lock poisoned: {e}"),
        })
    }

    /// Overwrites a stored event's payload in place, bypassing every
    /// append-only safeguard. Exists only to simulate out-of-band tampering
    /// for tests and the `run-demo --scenario tamper` walkthrough — no
    /// production code path reaches this.
    pub fn tamper_payload_for_test(
        &self,
        sequence_number: u64,
        payload: serde_json::Value,
    ) -> LedgerResult<()> {
        let mut state = self.lock()?;
        let event = state
            .events
            .get_mut(sequence_number as usize)
            .ok_or_else(|| LedgerError::UnknownEntity {
                kind: "event".to_string(),
                id: sequence_number.to_string(),
            })?;
        event.payload = payload;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ledger_contracts::event::EventType;
    use serde_json::json;

    use super::*;

    fn make_event(sequence_number: u64, previous_event_hash: Option<&str>) -> Event {
        let payload = json!({"statement": format!("claim number {sequence_number}")});
        let canonical = ledger_crypto::canonicalize(&payload).unwrap();
        let event_hash = ledger_crypto::event_hash(&canonical, previous_event_hash);
        Event {
            event_id: Uuid::new_v4(),
            sequence_number,
            event_type: EventType::ClaimDeclared,
            claim_id: Some(Uuid::new_v4()),
            payload,
            previous_event_hash: previous_event_hash.map(|s| s.to_string()),
            event_hash,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            editor_signature: "unused".to_string(),
        }
    }

    #[test]
    fn append_rejects_wrong_previous_hash() {
        let store = InMemoryEventStore::new();
        store.append(make_event(0, None)).unwrap();
        let bad = make_event(1, Some("not-the-real-tail"));
        assert!(matches!(store.append(bad), Err(LedgerError::HashChainBroken { .. })));
    }

    #[test]
    fn append_rejects_duplicate_event_id() {
        let store = InMemoryEventStore::new();
        let event = make_event(0, None);
        store.append(event.clone()).unwrap();
        let mut duplicate = make_event(1, Some(&event.event_hash));
        duplicate.event_id = event.event_id;
        assert!(matches!(store.append(duplicate), Err(LedgerError::DuplicateEventId { .. })));
    }

    #[test]
    fn verify_chain_detects_tampered_payload() {
        let store = InMemoryEventStore::new();
        let genesis = store.append(make_event(0, None)).unwrap();
        store.append(make_event(1, Some(&genesis.event_hash))).unwrap();

        assert!(matches!(store.verify_chain().unwrap(), ChainVerification::Intact { checked: 2 }));

        {
            let mut state = store.state.lock().unwrap();
            state.events[0].payload = json!({"statement": "tampered"});
        }

        match store.verify_chain().unwrap() {
            ChainVerification::Broken { sequence, .. } => assert_eq!(sequence, 0),
            other => panic!("expected Broken, got {other:?}"),
        }
    }

    #[test]
    fn range_and_tail_and_count() {
        let store = InMemoryEventStore::new();
        let e0 = store.append(make_event(0, None)).unwrap();
        let e1 = store.append(make_event(1, Some(&e0.event_hash))).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.tail().unwrap().unwrap().event_id, e1.event_id);
        assert_eq!(store.range(0, 1).unwrap().len(), 1);
        assert_eq!(store.range(0, 10).unwrap().len(), 2);
    }

    #[test]
    fn events_for_claim_filters_correctly() {
        let store = InMemoryEventStore::new();
        let e0 = store.append(make_event(0, None)).unwrap();
        let found = store.events_for_claim(e0.claim_id.unwrap()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_id, e0.event_id);
    }
}
