//! Immutable snapshot records and snapshot-creation options.
//!
//! # Responsibility
//! - Define the point-in-time capture shape: scalar copy + full membership
//!   copy + history metadata.
//! - Define the explicit per-call overrides (`actor`, `reason`, `at`) used
//!   when recording a snapshot.
//!
//! # Invariants
//! - `members` is sorted ascending by label id, so equal membership states
//!   compare equal structurally.
//! - A snapshot's membership copy reflects exactly the links active
//!   immediately after the triggering mutation; it is never a delta.

use crate::model::document::{DocumentId, LabelId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of change that produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Entity row was inserted.
    Created,
    /// Scalar fields were saved or label membership changed.
    Changed,
    /// Entity row was deleted; this is the final snapshot.
    Deleted,
}

impl ChangeKind {
    /// Single-character storage code.
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Created => "+",
            Self::Changed => "~",
            Self::Deleted => "-",
        }
    }

    /// Parses the storage code back into a kind.
    pub fn parse_db(value: &str) -> Option<Self> {
        match value {
            "+" => Some(Self::Created),
            "~" => Some(Self::Changed),
            "-" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// One active membership link captured inside a snapshot, as an id pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MembershipEntry {
    /// Owning document id.
    pub document_id: DocumentId,
    /// Referenced label id.
    pub label_id: LabelId,
}

/// Immutable point-in-time capture of one document.
///
/// Carries both the scalar field copy and the full membership copy, so any
/// two snapshots can be diffed without replaying an event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Append-order id; ties on `at` are broken by the highest id.
    pub history_id: i64,
    /// Id of the document this snapshot belongs to.
    pub document_id: DocumentId,
    /// Copy of the document name at capture time.
    pub name: String,
    /// What kind of change produced this snapshot.
    pub kind: ChangeKind,
    /// History timestamp (UTC).
    pub at: DateTime<Utc>,
    /// Optional free-text change reason.
    pub reason: Option<String>,
    /// Optional reference to the acting user.
    pub actor: Option<Uuid>,
    /// Full membership copy, sorted ascending by label id.
    pub members: Vec<MembershipEntry>,
}

/// Explicit per-call overrides for snapshot creation.
///
/// `at = None` means "capture at wall-clock UTC now". Passing a fixed `at`
/// supports deterministic fixtures without hidden per-object state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeOptions {
    /// Acting user reference recorded on the snapshot.
    pub actor: Option<Uuid>,
    /// Free-text change reason recorded on the snapshot.
    pub reason: Option<String>,
    /// History timestamp override.
    pub at: Option<DateTime<Utc>>,
}

impl ChangeOptions {
    /// Options with only a fixed history timestamp set.
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            at: Some(at),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeKind;

    #[test]
    fn change_kind_codes_round_trip() {
        for kind in [ChangeKind::Created, ChangeKind::Changed, ChangeKind::Deleted] {
            assert_eq!(ChangeKind::parse_db(kind.as_db()), Some(kind));
        }
        assert_eq!(ChangeKind::parse_db("?"), None);
    }
}
