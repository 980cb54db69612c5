//! Snapshot diff engine.
//!
//! # Responsibility
//! - Compare two snapshots of the same document and produce per-field
//!   changes.
//!
//! # Invariants
//! - Fields are compared from an explicit, declared list; there is no runtime
//!   field discovery.
//! - Membership is compared as a set of id pairs, but a difference is
//!   reported as one whole-value change carrying both full membership
//!   copies, never as itemized adds/removes. This keeps diff-at-any-two
//!   points possible without replaying an event log.
//! - The engine never resolves label ids to slugs; resolution stays with the
//!   caller so diffing remains pure and storage-agnostic.

use crate::model::snapshot::{MembershipEntry, Snapshot};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Scalar document field participating in history.
pub const NAME_FIELD: &str = "name";
/// Relationship field participating in history.
pub const LABELS_FIELD: &str = "labels";

/// Value of one side of a field change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Scalar text field copy.
    Text(String),
    /// Full membership-set copy, sorted ascending by label id.
    Members(Vec<MembershipEntry>),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value}"),
            Self::Members(entries) => {
                write!(f, "[")?;
                for (index, entry) in entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(
                        f,
                        "{{document: {}, label: {}}}",
                        entry.document_id, entry.label_id
                    )?;
                }
                write!(f, "]")
            }
        }
    }
}

/// One field-level difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// Declared field name.
    pub field: &'static str,
    /// Value on the older snapshot.
    pub old: FieldValue,
    /// Value on the newer snapshot.
    pub new: FieldValue,
}

impl Display for FieldChange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' changed from '{}' to '{}'",
            self.field, self.old, self.new
        )
    }
}

/// Compares two snapshots and returns the changed fields in declared order.
///
/// Unchanged fields are omitted; diffing a snapshot against itself yields an
/// empty sequence. Both operands must exist — diffing the earliest snapshot
/// against a missing predecessor is the caller's error to avoid.
pub fn diff(newer: &Snapshot, older: &Snapshot) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if newer.name != older.name {
        changes.push(FieldChange {
            field: NAME_FIELD,
            old: FieldValue::Text(older.name.clone()),
            new: FieldValue::Text(newer.name.clone()),
        });
    }

    let older_set: BTreeSet<MembershipEntry> = older.members.iter().copied().collect();
    let newer_set: BTreeSet<MembershipEntry> = newer.members.iter().copied().collect();
    if older_set != newer_set {
        changes.push(FieldChange {
            field: LABELS_FIELD,
            old: FieldValue::Members(older_set.into_iter().collect()),
            new: FieldValue::Members(newer_set.into_iter().collect()),
        });
    }

    changes
}
