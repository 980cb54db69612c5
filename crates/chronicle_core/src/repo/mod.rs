//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Every entity mutation records exactly one snapshot inside the same
//!   transaction as the triggering write; a rolled-back write persists no
//!   snapshot.
//! - Repository APIs return semantic errors (`DocumentNotFound`, `Integrity`)
//!   in addition to DB transport errors.

pub mod document_repo;
pub mod history_repo;
pub mod snapshot_store;
