//! # ledger-projector
//!
//! Folds the event stream into queryable read models and exposes them
//! through a read-only query layer.

pub mod projector;
pub mod query;

pub use projector::InMemoryProjector;
pub use query::{ClaimDetail, IntegritySummary, LedgerQuery};
