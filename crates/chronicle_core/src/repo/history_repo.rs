//! History query API over the snapshot log.
//!
//! # Responsibility
//! - Retrieve ordered snapshot sequences and the latest snapshot.
//! - Provide the one sanctioned log mutation: backdating the most recent
//!   snapshot's timestamp for deterministic fixtures.
//!
//! # Invariants
//! - Sequences are ordered by `(history_date DESC, history_id DESC)`; the id
//!   tie-break keeps the order deterministic for equal timestamps.
//! - "Latest" uses the same order, so it always equals `sequence_for(...)[0]`.
//! - Backdating rewrites only the timestamp field of one existing row.

use crate::model::document::DocumentId;
use crate::model::snapshot::{ChangeKind, MembershipEntry, Snapshot};
use crate::repo::document_repo::{RepoError, RepoResult};
use chrono::{DateTime, TimeZone, Utc};
use log::info;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const SNAPSHOT_SELECT_SQL: &str = "SELECT
    history_id,
    document_id,
    name,
    history_date,
    history_kind,
    history_reason,
    history_actor
FROM document_history";

/// Query interface over one document's snapshot sequence.
pub trait HistoryRepository {
    /// Returns all snapshots for the document, newest first.
    ///
    /// Fails with `NoHistory` when no snapshot exists.
    fn sequence_for(&self, document_id: DocumentId) -> RepoResult<Vec<Snapshot>>;
    /// Returns the most recent snapshot; timestamp ties resolve to the
    /// highest history id.
    fn latest_for(&self, document_id: DocumentId) -> RepoResult<Snapshot>;
    /// Overwrites the timestamp of the most recent snapshot and persists it.
    ///
    /// This is the only sanctioned mutation of a persisted snapshot. Callers
    /// building fixture timelines must backdate in the same order the changes
    /// were made, oldest first, so the final ordering stays chronological.
    fn backdate_latest(
        &mut self,
        document_id: DocumentId,
        at: DateTime<Utc>,
    ) -> RepoResult<Snapshot>;
}

/// Read-mostly SQLite history repository over a shared connection.
pub struct SqliteHistoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHistoryRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HistoryRepository for SqliteHistoryRepository<'_> {
    fn sequence_for(&self, document_id: DocumentId) -> RepoResult<Vec<Snapshot>> {
        sequence_for_conn(self.conn, document_id)
    }

    fn latest_for(&self, document_id: DocumentId) -> RepoResult<Snapshot> {
        latest_for_conn(self.conn, document_id)
    }

    fn backdate_latest(
        &mut self,
        document_id: DocumentId,
        at: DateTime<Utc>,
    ) -> RepoResult<Snapshot> {
        backdate_latest_conn(self.conn, document_id, at)
    }
}

pub(crate) fn sequence_for_conn(
    conn: &Connection,
    document_id: DocumentId,
) -> RepoResult<Vec<Snapshot>> {
    let mut stmt = conn.prepare(&format!(
        "{SNAPSHOT_SELECT_SQL}
         WHERE document_id = ?1
         ORDER BY history_date DESC, history_id DESC;"
    ))?;
    let mut rows = stmt.query([document_id])?;
    let mut snapshots = Vec::new();
    while let Some(row) = rows.next()? {
        let mut snapshot = parse_snapshot_row(row)?;
        snapshot.members = load_members(conn, snapshot.history_id)?;
        snapshots.push(snapshot);
    }

    if snapshots.is_empty() {
        return Err(RepoError::NoHistory(document_id));
    }
    Ok(snapshots)
}

pub(crate) fn latest_for_conn(conn: &Connection, document_id: DocumentId) -> RepoResult<Snapshot> {
    match latest_history_id(conn, document_id)? {
        Some(history_id) => load_snapshot(conn, history_id),
        None => Err(RepoError::NoHistory(document_id)),
    }
}

pub(crate) fn backdate_latest_conn(
    conn: &Connection,
    document_id: DocumentId,
    at: DateTime<Utc>,
) -> RepoResult<Snapshot> {
    let history_id =
        latest_history_id(conn, document_id)?.ok_or(RepoError::NoHistory(document_id))?;

    conn.execute(
        "UPDATE document_history SET history_date = ?2 WHERE history_id = ?1;",
        params![history_id, at.timestamp_millis()],
    )?;

    info!(
        "event=backdate_applied module=repo document_id={document_id} history_id={history_id} at={}",
        at.to_rfc3339()
    );

    load_snapshot(conn, history_id)
}

/// Loads one snapshot by its history id, including its membership copy.
pub(crate) fn load_snapshot(conn: &Connection, history_id: i64) -> RepoResult<Snapshot> {
    let mut stmt = conn.prepare(&format!("{SNAPSHOT_SELECT_SQL} WHERE history_id = ?1;"))?;
    let mut rows = stmt.query([history_id])?;
    let row = match rows.next()? {
        Some(row) => row,
        None => {
            return Err(RepoError::InvalidData(format!(
                "snapshot {history_id} vanished during read-back"
            )));
        }
    };

    let mut snapshot = parse_snapshot_row(row)?;
    snapshot.members = load_members(conn, history_id)?;
    Ok(snapshot)
}

fn latest_history_id(conn: &Connection, document_id: DocumentId) -> RepoResult<Option<i64>> {
    let mut stmt = conn.prepare(
        "SELECT history_id
         FROM document_history
         WHERE document_id = ?1
         ORDER BY history_date DESC, history_id DESC
         LIMIT 1;",
    )?;
    let mut rows = stmt.query([document_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(row.get(0)?));
    }
    Ok(None)
}

fn load_members(conn: &Connection, history_id: i64) -> RepoResult<Vec<MembershipEntry>> {
    let mut stmt = conn.prepare(
        "SELECT document_id, label_id
         FROM document_label_history
         WHERE history_id = ?1
         ORDER BY label_id ASC;",
    )?;
    let mut rows = stmt.query([history_id])?;
    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        members.push(MembershipEntry {
            document_id: row.get("document_id")?,
            label_id: row.get("label_id")?,
        });
    }
    Ok(members)
}

fn parse_snapshot_row(row: &Row<'_>) -> RepoResult<Snapshot> {
    let history_id: i64 = row.get("history_id")?;

    let kind_text: String = row.get("history_kind")?;
    let kind = ChangeKind::parse_db(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid change kind `{kind_text}` in document_history.history_kind"
        ))
    })?;

    let date_ms: i64 = row.get("history_date")?;
    let at = Utc.timestamp_millis_opt(date_ms).single().ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{date_ms}` in document_history.history_date"
        ))
    })?;

    let actor = match row.get::<_, Option<String>>("history_actor")? {
        Some(value) => Some(Uuid::parse_str(&value).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid actor uuid `{value}` in document_history.history_actor"
            ))
        })?),
        None => None,
    };

    Ok(Snapshot {
        history_id,
        document_id: row.get("document_id")?,
        name: row.get("name")?,
        kind,
        at,
        reason: row.get("history_reason")?,
        actor,
        members: Vec::new(),
    })
}
