//! Domain model for versioned documents and their label membership.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Define the immutable snapshot shape shared by repo and diff layers.
//!
//! # Invariants
//! - Live rows are identified by stable integer ids owned by storage.
//! - Snapshots are append-only; only `backdate_latest` may touch a persisted
//!   snapshot, and only its timestamp.

pub mod document;
pub mod snapshot;
