//! # ledger-contracts
//!
//! Shared types, error kinds, and payload schemas for the AccountabilityMe
//! ledger. No business logic lives here — only data definitions, the error
//! enum, and structural payload validation.

pub mod anchor;
pub mod claim;
pub mod command;
pub mod editor;
pub mod error;
pub mod event;
pub mod payload;
