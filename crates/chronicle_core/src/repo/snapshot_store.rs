//! Append-only snapshot recording.
//!
//! # Responsibility
//! - Append one immutable snapshot row per document mutation, inside the
//!   caller's transaction.
//! - Copy the full live membership set into the snapshot.
//!
//! # Invariants
//! - Snapshots of scalar saves and of membership changes share one log and
//!   one ordering.
//! - The membership copy is the full state after the triggering mutation,
//!   never a delta.
//! - Existing snapshot rows are never touched here; the only sanctioned
//!   mutation lives in `history_repo::backdate_latest`.

use crate::model::document::Document;
use crate::model::snapshot::{ChangeKind, ChangeOptions, Snapshot};
use crate::repo::document_repo::{RepoError, RepoResult};
use crate::repo::history_repo::load_snapshot;
use chrono::Utc;
use log::info;
use rusqlite::{params, Transaction};

/// Records a snapshot of the document's scalar fields plus its current
/// membership set.
///
/// Runs inside the caller's transaction so the snapshot commits or rolls
/// back together with the triggering write. With `opts.at` unset the history
/// timestamp is wall-clock UTC now.
pub fn record_snapshot(
    tx: &Transaction<'_>,
    document: &Document,
    kind: ChangeKind,
    opts: &ChangeOptions,
) -> RepoResult<Snapshot> {
    document.validate()?;
    append_snapshot_row(tx, document, kind, opts)
}

/// Records a snapshot triggered by a membership-link change.
///
/// Same log and shape as `record_snapshot`, with an extra integrity check:
/// every link about to be copied must still resolve to a live label.
pub fn record_membership_snapshot(
    tx: &Transaction<'_>,
    document: &Document,
    kind: ChangeKind,
    opts: &ChangeOptions,
) -> RepoResult<Snapshot> {
    document.validate()?;

    let dangling: i64 = tx.query_row(
        "SELECT COUNT(*)
         FROM document_labels dl
         LEFT JOIN labels l ON l.id = dl.label_id
         WHERE dl.document_id = ?1
           AND l.id IS NULL;",
        [document.id],
        |row| row.get(0),
    )?;
    if dangling > 0 {
        return Err(RepoError::Integrity(format!(
            "document {} has {dangling} membership link(s) referencing missing labels",
            document.id
        )));
    }

    append_snapshot_row(tx, document, kind, opts)
}

fn append_snapshot_row(
    tx: &Transaction<'_>,
    document: &Document,
    kind: ChangeKind,
    opts: &ChangeOptions,
) -> RepoResult<Snapshot> {
    let at = opts.at.unwrap_or_else(Utc::now);

    tx.execute(
        "INSERT INTO document_history (
            document_id,
            name,
            history_date,
            history_kind,
            history_reason,
            history_actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            document.id,
            document.name.as_str(),
            at.timestamp_millis(),
            kind.as_db(),
            opts.reason.as_deref(),
            opts.actor.map(|actor| actor.to_string()),
        ],
    )?;
    let history_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO document_label_history (history_id, document_id, label_id)
         SELECT ?1, document_id, label_id
         FROM document_labels
         WHERE document_id = ?2
         ORDER BY label_id ASC;",
        params![history_id, document.id],
    )?;

    info!(
        "event=snapshot_recorded module=repo document_id={} history_id={} kind={}",
        document.id,
        history_id,
        kind.as_db()
    );

    load_snapshot(tx, history_id)
}
