//! Document use-case service.
//!
//! # Responsibility
//! - Provide document/label/membership mutation APIs, each producing its
//!   snapshot through the repository layer.
//! - Expose history queries, backdating and the caller-side slug resolution
//!   that the diff engine deliberately does not perform.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or transaction
//!   boundaries.
//! - `resolve_member_slugs` preserves the order of the id pairs it is given.

use crate::model::document::{Document, DocumentId, Label, LabelId};
use crate::model::snapshot::{ChangeOptions, MembershipEntry, Snapshot};
use crate::repo::document_repo::{DocumentRepository, RepoError, RepoResult};
use crate::repo::history_repo::HistoryRepository;
use chrono::{DateTime, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for document use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Target document does not exist.
    DocumentNotFound(DocumentId),
    /// A snapshot's membership entry references a label that no longer
    /// exists; the raw id-pair diff is still valid, only resolution fails.
    DanglingLabel(LabelId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::DanglingLabel(id) => {
                write!(f, "membership entry references missing label: {id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DocumentNotFound(id) => Self::DocumentNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Use-case facade over a repository providing both document persistence and
/// history queries.
pub struct DocumentService<R: DocumentRepository + HistoryRepository> {
    repo: R,
}

impl<R: DocumentRepository + HistoryRepository> DocumentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a document; its `Created` snapshot is recorded in the same
    /// transaction.
    pub fn create_document(
        &mut self,
        name: impl Into<String>,
        opts: &ChangeOptions,
    ) -> Result<Document, ServiceError> {
        let name = name.into();
        let document = self.repo.create_document(name.as_str(), opts)?;
        info!(
            "event=document_created module=service document_id={}",
            document.id
        );
        Ok(document)
    }

    /// Saves a new document name; records a `Changed` snapshot.
    pub fn rename_document(
        &mut self,
        id: DocumentId,
        name: impl Into<String>,
        opts: &ChangeOptions,
    ) -> Result<Document, ServiceError> {
        let name = name.into();
        Ok(self.repo.rename_document(id, name.as_str(), opts)?)
    }

    /// Gets one document by id.
    pub fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        self.repo.get_document(id)
    }

    /// Deletes a document after recording its final `Deleted` snapshot.
    /// History is kept, links cascade.
    pub fn delete_document(
        &mut self,
        id: DocumentId,
        opts: &ChangeOptions,
    ) -> Result<(), ServiceError> {
        self.repo.delete_document(id, opts)?;
        info!("event=document_deleted module=service document_id={id}");
        Ok(())
    }

    /// Creates a label.
    pub fn create_label(&mut self, slug: impl Into<String>) -> RepoResult<Label> {
        let slug = slug.into();
        self.repo.create_label(slug.as_str())
    }

    /// Deletes a label; fails with `Integrity` while membership links still
    /// reference it.
    pub fn delete_label(&mut self, id: LabelId) -> RepoResult<()> {
        self.repo.delete_label(id)
    }

    /// Lists all labels ordered by slug.
    pub fn list_labels(&self) -> RepoResult<Vec<Label>> {
        self.repo.list_labels()
    }

    /// Lists the labels currently linked to a document.
    pub fn labels_for(&self, document_id: DocumentId) -> RepoResult<Vec<Label>> {
        self.repo.labels_for(document_id)
    }

    /// Links an existing label to a document; records a membership snapshot.
    pub fn add_label(
        &mut self,
        document_id: DocumentId,
        label_id: LabelId,
        opts: &ChangeOptions,
    ) -> Result<Snapshot, ServiceError> {
        Ok(self.repo.add_label(document_id, label_id, opts)?)
    }

    /// Unlinks a label from a document; records a membership snapshot.
    pub fn remove_label(
        &mut self,
        document_id: DocumentId,
        label_id: LabelId,
        opts: &ChangeOptions,
    ) -> Result<Snapshot, ServiceError> {
        Ok(self.repo.remove_label(document_id, label_id, opts)?)
    }

    /// Creates a label and links it to the document in one transaction,
    /// recording one membership snapshot.
    pub fn attach_new_label(
        &mut self,
        document_id: DocumentId,
        slug: impl Into<String>,
        opts: &ChangeOptions,
    ) -> Result<(Label, Snapshot), ServiceError> {
        let slug = slug.into();
        let (label, snapshot) = self.repo.attach_new_label(document_id, slug.as_str(), opts)?;
        info!(
            "event=label_attached module=service document_id={document_id} label_id={}",
            label.id
        );
        Ok((label, snapshot))
    }

    /// Returns the document's snapshot sequence, newest first.
    pub fn history(&self, document_id: DocumentId) -> RepoResult<Vec<Snapshot>> {
        self.repo.sequence_for(document_id)
    }

    /// Returns the most recent snapshot for the document.
    pub fn latest(&self, document_id: DocumentId) -> RepoResult<Snapshot> {
        self.repo.latest_for(document_id)
    }

    /// Rewrites the timestamp of the document's most recent snapshot.
    ///
    /// Fixture-building helper; callers backdate oldest-first so the final
    /// sequence stays chronologically sensible.
    pub fn backdate_latest(
        &mut self,
        document_id: DocumentId,
        at: DateTime<Utc>,
    ) -> RepoResult<Snapshot> {
        self.repo.backdate_latest(document_id, at)
    }

    /// Resolves membership id pairs to label slugs, preserving input order.
    ///
    /// Layered on top of the raw id-pair diff; fails with `DanglingLabel`
    /// when a referenced label has since been deleted.
    pub fn resolve_member_slugs(
        &self,
        members: &[MembershipEntry],
    ) -> Result<Vec<String>, ServiceError> {
        let mut slugs = Vec::with_capacity(members.len());
        for entry in members {
            let label = self
                .repo
                .get_label(entry.label_id)?
                .ok_or(ServiceError::DanglingLabel(entry.label_id))?;
            slugs.push(label.slug);
        }
        Ok(slugs)
    }
}
