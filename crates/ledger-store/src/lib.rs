//! # ledger-store
//!
//! `EventStore` implementations: an in-memory store for tests and ephemeral
//! deployments, and a SQLite-backed store for durable single-node
//! deployments.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryEventStore;
pub use sqlite::SqliteEventStore;
