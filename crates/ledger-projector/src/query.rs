//! The read-only query layer.
//!
//! `LedgerQuery` sits over a projector handle and a store handle the way
//! every read-only query wrapper in the pack does: it never mutates either,
//! and it merges the projection's denormalized view with a targeted scan of
//! the store when a view needs something the projection doesn't keep around
//! (here, the per-claim event timeline backing `get_claim_detail`).

use std::sync::Arc;

use uuid::Uuid;

use ledger_contracts::claim::{ClaimView, EvidenceView};
use ledger_contracts::editor::Editor;
use ledger_contracts::error::LedgerResult;
use ledger_contracts::event::Event;
use ledger_core::traits::{ChainVerification, EventStore};

use crate::projector::InMemoryProjector;

/// A claim's projected view plus its evidence and the event timeline that
/// produced it, reconstructed from the store rather than kept by the
/// projector.
#[derive(Debug, Clone)]
pub struct ClaimDetail {
    pub claim: ClaimView,
    pub evidence: Vec<EvidenceView>,
    pub timeline: Vec<Event>,
}

/// Chain health plus the total event count, as printed by `verify-chain`.
#[derive(Debug, Clone)]
pub struct IntegritySummary {
    pub event_count: u64,
    pub verification: ChainVerification,
}

/// The read-only facade over a projector and a store.
pub struct LedgerQuery {
    store: Arc<dyn EventStore>,
    projector: Arc<InMemoryProjector>,
}

impl LedgerQuery {
    pub fn new(store: Arc<dyn EventStore>, projector: Arc<InMemoryProjector>) -> Self {
        Self { store, projector }
    }

    pub fn list_claims(&self) -> LedgerResult<Vec<ClaimView>> {
        self.projector.list_claim_views()
    }

    pub fn get_claim_detail(&self, claim_id: Uuid) -> LedgerResult<Option<ClaimDetail>> {
        let Some(claim) = self.projector.claim_view(claim_id)? else {
            return Ok(None);
        };
        let evidence = self.projector.evidence_for_claim(claim_id)?;
        let mut timeline = self.store.events_for_claim(claim_id)?;
        timeline.sort_by_key(|e| e.sequence_number);
        Ok(Some(ClaimDetail { claim, evidence, timeline }))
    }

    pub fn get_editor(&self, editor_id: Uuid) -> LedgerResult<Option<Editor>> {
        self.projector.editor(editor_id)
    }

    pub fn list_editors(&self) -> LedgerResult<Vec<Editor>> {
        self.projector.list_editors()
    }

    pub fn get_integrity(&self) -> LedgerResult<IntegritySummary> {
        Ok(IntegritySummary {
            event_count: self.store.count()?,
            verification: self.store.verify_chain()?,
        })
    }
}
