//! # ledger-bundle
//!
//! Exports a claim's event history into a self-contained, independently
//! verifiable artifact, and verifies one without access to the live ledger
//!.

pub mod bundle;
pub mod export;
pub mod verify;

pub use bundle::{BundleMeta, ClaimBundle, ClaimSummary, EditorKeyInfo, VerificationInfo};
pub use export::{export_bundle, EditorDirectory};
pub use verify::{verify_bundle, BundleVerdict};
