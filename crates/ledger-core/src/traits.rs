//! Core trait definitions for the ledger pipeline.
//!
//! These three traits define the trust boundary around `LedgerService`:
//!
//! - `EventStore`   — trusted sink (append-only, rejects broken chain links)
//! - `Projector`    — trusted read-model builder (folds events, idempotent)
//! - `EditorSigner` — trusted key custody (produces a signature for a given
//!   editor over a given event hash)
//!
//! `LedgerService` wires them together in a fixed order; it never
//! calls store or projector methods out of that order.

use uuid::Uuid;

use ledger_contracts::claim::ClaimStatus;
use ledger_contracts::error::LedgerResult;
use ledger_contracts::event::Event;

/// The minimal editor facts `LedgerService` needs to authorize a command
///. The full `Editor` projection lives in `ledger-projector`;
/// this is the slice of it the ledger core's trust boundary depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorAuthView {
    pub is_active: bool,
    pub public_key: String,
}

/// The result of a full or partial hash-chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerification {
    /// Every event from sequence 0 to the tail re-hashes correctly and links
    /// to its predecessor.
    Intact { checked: u64 },
    /// The chain breaks at `sequence`: either `event_hash` does not match
    /// the recomputed hash, or `previous_event_hash` does not match the
    /// prior event's `event_hash`.
    Broken { sequence: u64, reason: String },
}

/// The append-only backing store for the event log.
///
/// Implementations must treat `append` as atomic with respect to
/// `previous_event_hash`: if the tail has moved since the caller last read
/// it, `append` must reject with `LedgerError::HashChainBroken` rather than
/// silently inserting a fork.
pub trait EventStore: Send + Sync {
    /// Append `event` as the new tail. `event.sequence_number` and
    /// `event.previous_event_hash` must already be set to what the caller
    /// believes is correct; the store re-validates both under its lock and
    /// returns the stored event (unchanged) on success.
    fn append(&self, event: Event) -> LedgerResult<Event>;

    /// Look up a single event by id.
    fn get(&self, event_id: Uuid) -> LedgerResult<Option<Event>>;

    /// Look up a single event by its position in the chain.
    fn get_by_sequence(&self, sequence_number: u64) -> LedgerResult<Option<Event>>;

    /// Return events with `from <= sequence_number < to`, in order.
    fn range(&self, from: u64, to: u64) -> LedgerResult<Vec<Event>>;

    /// The most recently appended event, or `None` for an empty store.
    fn tail(&self) -> LedgerResult<Option<Event>>;

    /// Total number of events appended so far.
    fn count(&self) -> LedgerResult<u64>;

    /// All events carrying the given `claim_id`, in sequence order.
    fn events_for_claim(&self, claim_id: Uuid) -> LedgerResult<Vec<Event>>;

    /// Re-derive every event's hash and chain linkage from storage and
    /// report the first break found, or `Intact` if none.
    fn verify_chain(&self) -> LedgerResult<ChainVerification>;
}

/// The read-model builder: folds the event stream into queryable
/// projections.
///
/// `apply` must be idempotent: replaying the same event twice (same
/// `event_id` and `sequence_number`) must not double-count it. This lets
/// `LedgerService::submit` call `apply` synchronously after every append
/// without the caller worrying about at-least-once delivery.
pub trait Projector: Send + Sync {
    /// Fold one event into the projection state.
    fn apply(&self, event: &Event) -> LedgerResult<()>;

    /// The highest `sequence_number` this projector has applied, or `None`
    /// if it has applied nothing yet.
    fn last_applied_sequence(&self) -> LedgerResult<Option<u64>>;

    /// Discard all projected state. Used before a full rebuild.
    fn reset(&self) -> LedgerResult<()>;

    /// The current lifecycle status of `claim_id`, or `None` if it has no
    /// `CLAIM_DECLARED` event yet. Consulted by `LedgerService::submit` for
    /// the lifecycle check.
    fn claim_status(&self, claim_id: Uuid) -> LedgerResult<Option<ClaimStatus>>;

    /// The auth-relevant facts about `editor_id`, or `None` if unregistered.
    fn editor_auth(&self, editor_id: Uuid) -> LedgerResult<Option<EditorAuthView>>;
}

/// Key custody for editor signatures.
///
/// The ledger core does not store private keys itself — an `EditorSigner`
/// implementation resolves `editor_id` to a signing capability and produces
/// a base64 signature over the raw bytes of an event hash. Tests and
/// the CLI demo use an in-memory implementation that holds generated
/// keypairs directly; a production deployment could back this with an HSM
/// or a remote signer without changing `LedgerService`.
pub trait EditorSigner: Send + Sync {
    fn sign_for_editor(&self, editor_id: Uuid, event_hash_hex: &str) -> LedgerResult<String>;
}
