//! Unified error type for the AccountabilityMe ledger.
//!
//! All fallible operations across the ledger crates return `LedgerResult<T>`.
//! Variants carry enough context to produce actionable messages for
//! operators and, eventually, audit entries.

use thiserror::Error;

/// The unified error type for ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A command's payload failed schema validation.
    #[error("validation error: {reason}")]
    ValidationError { reason: String },

    /// The command would move a claim outside its lifecycle graph.
    #[error("illegal transition: {reason}")]
    IllegalTransition { reason: String },

    /// A referenced claim_id or editor_id does not exist in the projections.
    #[error("unknown entity: {kind} '{id}' not found")]
    UnknownEntity { kind: String, id: String },

    /// The editor is unknown or has been deactivated.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The store's tail moved between reading `previous_event_hash` and
    /// appending. Retried internally up to 3 times by the ledger service.
    #[error("hash chain broken: expected previous hash {expected}, tail is {actual}")]
    HashChainBroken { expected: String, actual: String },

    /// `event_id` collided with an existing event.
    #[error("duplicate event id: {event_id}")]
    DuplicateEventId { event_id: String },

    /// The backing store could not be reached or written to.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// Chain verification failed; the ledger refuses further writes until an
    /// operator calls `mark_recovered`.
    #[error("ledger corruption detected at sequence {sequence}: {reason}")]
    LedgerCorruption { sequence: u64, reason: String },

    /// A signature failed verification on read or during bundle validation.
    #[error("signature invalid: {reason}")]
    SignatureInvalid { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// Canonicalization or parsing of a payload failed.
    #[error("canonicalization error: {reason}")]
    CanonicalizationError { reason: String },
}

/// Convenience alias used throughout the ledger crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
