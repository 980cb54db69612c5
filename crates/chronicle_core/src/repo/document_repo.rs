//! Document/label repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs for documents, labels and membership links.
//! - Pair every document mutation with its snapshot in one transaction.
//!
//! # Invariants
//! - Write paths validate scalar fields before SQL mutations.
//! - Deleting a document cascades its links; deleting a referenced label is
//!   blocked by the storage layer and surfaces as `Integrity`.
//! - Link mutations record a membership snapshot before the transaction
//!   commits.

use crate::db::DbError;
use crate::model::document::{
    validate_text_field, Document, DocumentId, Label, LabelId, ValidationError,
};
use crate::model::snapshot::{ChangeKind, ChangeOptions, Snapshot};
use crate::repo::history_repo::{
    backdate_latest_conn, latest_for_conn, sequence_for_conn, HistoryRepository,
};
use crate::repo::snapshot_store::{record_membership_snapshot, record_snapshot};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Transaction, TransactionBehavior};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence, history and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Scalar field value violates declared constraints.
    Validation(ValidationError),
    /// Referential integrity violation (dangling reference, protected label,
    /// duplicate membership link).
    Integrity(String),
    /// Document row does not exist.
    DocumentNotFound(DocumentId),
    /// Label row does not exist.
    LabelNotFound(LabelId),
    /// Membership link does not exist.
    LinkNotFound {
        document_id: DocumentId,
        label_id: LabelId,
    },
    /// Document has no snapshots.
    NoHistory(DocumentId),
    /// Storage transport failure.
    Db(DbError),
    /// Persisted state failed to parse back into domain types.
    InvalidData(String),
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Integrity(message) => write!(f, "integrity violation: {message}"),
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::LabelNotFound(id) => write!(f, "label not found: {id}"),
            Self::LinkNotFound {
                document_id,
                label_id,
            } => write!(
                f,
                "membership link not found: document {document_id}, label {label_id}"
            ),
            Self::NoHistory(id) => write!(f, "no snapshots recorded for document {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl std::error::Error for RepoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        // Constraint failures are semantic errors, not transport errors.
        if let rusqlite::Error::SqliteFailure(ref code, ref message) = value {
            if code.code == ErrorCode::ConstraintViolation {
                return Self::Integrity(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for documents, labels and membership links.
///
/// Every mutation of a document or of its membership records one snapshot in
/// the same transaction as the write.
pub trait DocumentRepository {
    /// Creates a document and records its `Created` snapshot.
    fn create_document(&mut self, name: &str, opts: &ChangeOptions) -> RepoResult<Document>;
    /// Saves a new name and records a `Changed` snapshot.
    fn rename_document(
        &mut self,
        id: DocumentId,
        name: &str,
        opts: &ChangeOptions,
    ) -> RepoResult<Document>;
    /// Gets one document by id.
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    /// Records a final `Deleted` snapshot, then hard-deletes the document.
    /// Links cascade; history rows persist.
    fn delete_document(&mut self, id: DocumentId, opts: &ChangeOptions) -> RepoResult<()>;

    /// Creates a label. Labels are not versioned.
    fn create_label(&mut self, slug: &str) -> RepoResult<Label>;
    /// Gets one label by id.
    fn get_label(&self, id: LabelId) -> RepoResult<Option<Label>>;
    /// Lists all labels ordered by slug.
    fn list_labels(&self) -> RepoResult<Vec<Label>>;
    /// Deletes a label; fails with `Integrity` while links reference it.
    fn delete_label(&mut self, id: LabelId) -> RepoResult<()>;

    /// Adds a membership link and records a membership snapshot.
    fn add_label(
        &mut self,
        document_id: DocumentId,
        label_id: LabelId,
        opts: &ChangeOptions,
    ) -> RepoResult<Snapshot>;
    /// Removes a membership link and records a membership snapshot.
    fn remove_label(
        &mut self,
        document_id: DocumentId,
        label_id: LabelId,
        opts: &ChangeOptions,
    ) -> RepoResult<Snapshot>;
    /// Creates a label and links it to the document in one transaction.
    fn attach_new_label(
        &mut self,
        document_id: DocumentId,
        slug: &str,
        opts: &ChangeOptions,
    ) -> RepoResult<(Label, Snapshot)>;
    /// Lists the labels currently linked to a document, ordered by label id.
    fn labels_for(&self, document_id: DocumentId) -> RepoResult<Vec<Label>>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    fn immediate_tx(&mut self) -> RepoResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_document(&mut self, name: &str, opts: &ChangeOptions) -> RepoResult<Document> {
        validate_text_field("name", name)?;

        let tx = self.immediate_tx()?;
        tx.execute("INSERT INTO documents (name) VALUES (?1);", [name])?;
        let document = Document {
            id: tx.last_insert_rowid(),
            name: name.to_string(),
        };
        record_snapshot(&tx, &document, ChangeKind::Created, opts)?;
        tx.commit()?;

        Ok(document)
    }

    fn rename_document(
        &mut self,
        id: DocumentId,
        name: &str,
        opts: &ChangeOptions,
    ) -> RepoResult<Document> {
        validate_text_field("name", name)?;

        let tx = self.immediate_tx()?;
        let changed = tx.execute(
            "UPDATE documents SET name = ?2 WHERE id = ?1;",
            params![id, name],
        )?;
        if changed == 0 {
            return Err(RepoError::DocumentNotFound(id));
        }

        let document = Document {
            id,
            name: name.to_string(),
        };
        record_snapshot(&tx, &document, ChangeKind::Changed, opts)?;
        tx.commit()?;

        Ok(document)
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        get_document_in(&*self.conn, id)
    }

    fn delete_document(&mut self, id: DocumentId, opts: &ChangeOptions) -> RepoResult<()> {
        let tx = self.immediate_tx()?;
        let document = get_document_in(&tx, id)?.ok_or(RepoError::DocumentNotFound(id))?;

        // The final snapshot captures membership as it stood at deletion,
        // so it must be recorded before the cascade removes the links.
        record_snapshot(&tx, &document, ChangeKind::Deleted, opts)?;
        tx.execute("DELETE FROM documents WHERE id = ?1;", [id])?;
        tx.commit()?;

        Ok(())
    }

    fn create_label(&mut self, slug: &str) -> RepoResult<Label> {
        validate_text_field("slug", slug)?;

        self.conn
            .execute("INSERT INTO labels (slug) VALUES (?1);", [slug])?;
        Ok(Label {
            id: self.conn.last_insert_rowid(),
            slug: slug.to_string(),
        })
    }

    fn get_label(&self, id: LabelId) -> RepoResult<Option<Label>> {
        get_label_in(&*self.conn, id)
    }

    fn list_labels(&self) -> RepoResult<Vec<Label>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, slug FROM labels ORDER BY slug ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(Label {
                id: row.get("id")?,
                slug: row.get("slug")?,
            });
        }
        Ok(labels)
    }

    fn delete_label(&mut self, id: LabelId) -> RepoResult<()> {
        // RESTRICT on document_labels.label_id turns deletion of a
        // still-referenced label into a constraint violation.
        let changed = self.conn.execute("DELETE FROM labels WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::LabelNotFound(id));
        }
        Ok(())
    }

    fn add_label(
        &mut self,
        document_id: DocumentId,
        label_id: LabelId,
        opts: &ChangeOptions,
    ) -> RepoResult<Snapshot> {
        let tx = self.immediate_tx()?;
        let document =
            get_document_in(&tx, document_id)?.ok_or(RepoError::DocumentNotFound(document_id))?;
        if get_label_in(&tx, label_id)?.is_none() {
            return Err(RepoError::LabelNotFound(label_id));
        }

        tx.execute(
            "INSERT INTO document_labels (document_id, label_id) VALUES (?1, ?2);",
            params![document_id, label_id],
        )?;
        let snapshot = record_membership_snapshot(&tx, &document, ChangeKind::Changed, opts)?;
        tx.commit()?;

        Ok(snapshot)
    }

    fn remove_label(
        &mut self,
        document_id: DocumentId,
        label_id: LabelId,
        opts: &ChangeOptions,
    ) -> RepoResult<Snapshot> {
        let tx = self.immediate_tx()?;
        let document =
            get_document_in(&tx, document_id)?.ok_or(RepoError::DocumentNotFound(document_id))?;

        let changed = tx.execute(
            "DELETE FROM document_labels WHERE document_id = ?1 AND label_id = ?2;",
            params![document_id, label_id],
        )?;
        if changed == 0 {
            return Err(RepoError::LinkNotFound {
                document_id,
                label_id,
            });
        }

        let snapshot = record_membership_snapshot(&tx, &document, ChangeKind::Changed, opts)?;
        tx.commit()?;

        Ok(snapshot)
    }

    fn attach_new_label(
        &mut self,
        document_id: DocumentId,
        slug: &str,
        opts: &ChangeOptions,
    ) -> RepoResult<(Label, Snapshot)> {
        validate_text_field("slug", slug)?;

        let tx = self.immediate_tx()?;
        let document =
            get_document_in(&tx, document_id)?.ok_or(RepoError::DocumentNotFound(document_id))?;

        tx.execute("INSERT INTO labels (slug) VALUES (?1);", [slug])?;
        let label = Label {
            id: tx.last_insert_rowid(),
            slug: slug.to_string(),
        };
        tx.execute(
            "INSERT INTO document_labels (document_id, label_id) VALUES (?1, ?2);",
            params![document_id, label.id],
        )?;
        let snapshot = record_membership_snapshot(&tx, &document, ChangeKind::Changed, opts)?;
        tx.commit()?;

        Ok((label, snapshot))
    }

    fn labels_for(&self, document_id: DocumentId) -> RepoResult<Vec<Label>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.slug
             FROM document_labels dl
             INNER JOIN labels l ON l.id = dl.label_id
             WHERE dl.document_id = ?1
             ORDER BY l.id ASC;",
        )?;
        let mut rows = stmt.query([document_id])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(Label {
                id: row.get("id")?,
                slug: row.get("slug")?,
            });
        }
        Ok(labels)
    }
}

impl HistoryRepository for SqliteDocumentRepository<'_> {
    fn sequence_for(&self, document_id: DocumentId) -> RepoResult<Vec<Snapshot>> {
        sequence_for_conn(&*self.conn, document_id)
    }

    fn latest_for(&self, document_id: DocumentId) -> RepoResult<Snapshot> {
        latest_for_conn(&*self.conn, document_id)
    }

    fn backdate_latest(
        &mut self,
        document_id: DocumentId,
        at: DateTime<Utc>,
    ) -> RepoResult<Snapshot> {
        backdate_latest_conn(&*self.conn, document_id, at)
    }
}

fn get_document_in(conn: &Connection, id: DocumentId) -> RepoResult<Option<Document>> {
    let mut stmt = conn.prepare("SELECT id, name FROM documents WHERE id = ?1;")?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(Document {
            id: row.get("id")?,
            name: row.get("name")?,
        }));
    }
    Ok(None)
}

fn get_label_in(conn: &Connection, id: LabelId) -> RepoResult<Option<Label>> {
    let mut stmt = conn.prepare("SELECT id, slug FROM labels WHERE id = ?1;")?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(Label {
            id: row.get("id")?,
            slug: row.get("slug")?,
        }));
    }
    Ok(None)
}
