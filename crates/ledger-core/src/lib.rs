//! # ledger-core
//!
//! The deterministic, authorization-bound write pipeline for the
//! AccountabilityMe ledger, plus the trait boundary (`EventStore`,
//! `Projector`, `EditorSigner`) that storage and projection crates
//! implement against.

pub mod lifecycle;
pub mod service;
pub mod traits;

pub use service::LedgerService;
pub use traits::{ChainVerification, EditorAuthView, EditorSigner, EventStore, Projector};
