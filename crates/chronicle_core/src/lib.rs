//! Audit-history engine for a document/label relational model.
//!
//! Every change to a document's scalar fields and to its label membership is
//! captured as an immutable snapshot in an ordered, append-only log; any two
//! snapshots can be diffed without replaying an event log.

pub mod db;
pub mod diff;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use diff::{diff, FieldChange, FieldValue};
pub use logging::{default_log_level, init_logging};
pub use model::document::{
    Document, DocumentId, Label, LabelId, ValidationError, MAX_TEXT_FIELD_CHARS,
};
pub use model::snapshot::{ChangeKind, ChangeOptions, MembershipEntry, Snapshot};
pub use repo::document_repo::{
    DocumentRepository, RepoError, RepoResult, SqliteDocumentRepository,
};
pub use repo::history_repo::{HistoryRepository, SqliteHistoryRepository};
pub use service::document_service::{DocumentService, ServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
