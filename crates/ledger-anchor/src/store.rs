//! Anchor batch bookkeeping.
//!
//! Anchor batches are append-only rows derived from the event stream but
//! never rebuilt from it — publication to an external witness is a one-way
//! act, so `AnchorBatchStore` is a small CRUD-shaped trait rather than an
//! event-sourced projection. The in-memory implementation follows the same
//! `Mutex`-guarded `Vec` + index map shape as `ledger_store::memory::
//! InMemoryEventStore`, scaled down to the handful of fields a batch needs.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use ledger_contracts::anchor::{AnchorBatch, AnchorStatus};
use ledger_contracts::error::{LedgerError, LedgerResult};

/// Storage for anchor batch metadata.
pub trait AnchorBatchStore: Send + Sync {
    fn insert(&self, batch: AnchorBatch) -> LedgerResult<AnchorBatch>;
    fn update_status(
        &self,
        batch_id: Uuid,
        status: AnchorStatus,
        external_reference: Option<String>,
    ) -> LedgerResult<AnchorBatch>;
    fn get(&self, batch_id: Uuid) -> LedgerResult<Option<AnchorBatch>>;
    /// The highest `end_sequence` among all recorded batches, used to find
    /// the start of the next contiguous range.
    fn latest_end_sequence(&self) -> LedgerResult<Option<u64>>;
    /// The batch whose `[start_sequence, end_sequence]` range contains
    /// `sequence_number`, if any.
    fn batch_containing(&self, sequence_number: u64) -> LedgerResult<Option<AnchorBatch>>;
    fn list(&self) -> LedgerResult<Vec<AnchorBatch>>;
}

struct State {
    batches: Vec<AnchorBatch>,
    by_id: HashMap<Uuid, usize>,
}

/// In-memory `AnchorBatchStore`, used by the CLI demo and by tests.
pub struct InMemoryAnchorStore {
    state: Mutex<State>,
}

impl InMemoryAnchorStore {
    pub fn new() -> Self {
        Self { state: Mutex::new(State { batches: Vec::new(), by_id: HashMap::new() }) }
    }

    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, State>> {
        self.state.lock().map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("anchor store lock poisoned: {e}"),
        })
    }
}

impl Default for InMemoryAnchorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnchorBatchStore for InMemoryAnchorStore {
    fn insert(&self, batch: AnchorBatch) -> LedgerResult<AnchorBatch> {
        let mut state = self.lock()?;
        let index = state.batches.len();
        state.by_id.insert(batch.batch_id, index);
        state.batches.push(batch.clone());
        Ok(batch)
    }

    fn update_status(
        &self,
        batch_id: Uuid,
        status: AnchorStatus,
        external_reference: Option<String>,
    ) -> LedgerResult<AnchorBatch> {
        let mut state = self.lock()?;
        let index = *state.by_id.get(&batch_id).ok_or_else(|| LedgerError::UnknownEntity {
            kind: "anchor_batch".to_string(),
            id: batch_id.to_string(),
        })?;
        let batch = &mut state.batches[index];
        batch.status = status;
        if external_reference.is_some() {
            batch.external_reference = external_reference;
        }
        Ok(batch.clone())
    }

    fn get(&self, batch_id: Uuid) -> LedgerResult<Option<AnchorBatch>> {
        let state = self.lock()?;
        Ok(state.by_id.get(&batch_id).map(|&i| state.batches[i].clone()))
    }

    fn latest_end_sequence(&self) -> LedgerResult<Option<u64>> {
        let state = self.lock()?;
        Ok(state.batches.iter().map(|b| b.end_sequence).max())
    }

    fn batch_containing(&self, sequence_number: u64) -> LedgerResult<Option<AnchorBatch>> {
        let state = self.lock()?;
        Ok(state
            .batches
            .iter()
            .find(|b| b.start_sequence <= sequence_number && sequence_number <= b.end_sequence)
            .cloned())
    }

    fn list(&self) -> LedgerResult<Vec<AnchorBatch>> {
        Ok(self.lock()?.batches.clone())
    }
}
