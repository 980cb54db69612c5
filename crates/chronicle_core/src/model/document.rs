//! Document and label domain records.
//!
//! # Responsibility
//! - Define the versioned entity (`Document`) and the referenced value entity
//!   (`Label`).
//! - Enforce scalar field constraints before persistence.
//!
//! # Invariants
//! - `id` values are assigned by storage and never reused.
//! - `name` and `slug` are non-blank and at most 50 characters.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum length for document names and label slugs.
pub const MAX_TEXT_FIELD_CHARS: usize = 50;

/// Stable identifier for a document row.
pub type DocumentId = i64;

/// Stable identifier for a label row.
pub type LabelId = i64;

/// Scalar field constraint violation raised before any SQL mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field value is empty or whitespace-only.
    BlankField(&'static str),
    /// Field value exceeds `MAX_TEXT_FIELD_CHARS`.
    FieldTooLong { field: &'static str, chars: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "field `{field}` must not be blank"),
            Self::FieldTooLong { field, chars } => write!(
                f,
                "field `{field}` is {chars} chars, max {MAX_TEXT_FIELD_CHARS}"
            ),
        }
    }
}

impl Error for ValidationError {}

/// The versioned entity: a named document with label membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Storage-assigned primary key, immutable once created.
    pub id: DocumentId,
    /// Display name; the only scalar field participating in history.
    pub name: String,
}

impl Document {
    /// Checks scalar field constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text_field("name", &self.name)
    }
}

/// A referenced value entity linked to documents via membership links.
///
/// Labels are not versioned themselves; they are referentially protected and
/// cannot be deleted while a live membership link points at them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Storage-assigned primary key.
    pub id: LabelId,
    /// Short human-readable identifier.
    pub slug: String,
}

impl Label {
    /// Checks scalar field constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text_field("slug", &self.slug)
    }
}

/// Validates one bounded text field shared by documents and labels.
pub fn validate_text_field(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    let chars = value.chars().count();
    if chars > MAX_TEXT_FIELD_CHARS {
        return Err(ValidationError::FieldTooLong { field, chars });
    }
    Ok(())
}
