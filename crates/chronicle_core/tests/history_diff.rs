use chrono::{DateTime, TimeZone, Utc};
use chronicle_core::db::open_db_in_memory;
use chronicle_core::{
    diff, ChangeOptions, DocumentId, DocumentService, FieldValue, ServiceError,
    SqliteDocumentRepository,
};

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn build_timeline(service: &mut DocumentService<SqliteDocumentRepository<'_>>) -> DocumentId {
    let document = service
        .create_document("doc one", &ChangeOptions::at(day(2024, 1, 1)))
        .unwrap();
    for (slug, at) in [
        ("red", day(2024, 2, 1)),
        ("green", day(2024, 3, 1)),
        ("blue", day(2024, 4, 1)),
    ] {
        service
            .attach_new_label(document.id, slug, &ChangeOptions::at(at))
            .unwrap();
    }
    document.id
}

#[test]
fn diffing_adjacent_snapshots_yields_one_membership_change() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));
    let document_id = build_timeline(&mut service);

    let history = service.history(document_id).unwrap();
    let newer = &history[0]; // 2024-04-01: red, green, blue
    let older = &history[1]; // 2024-03-01: red, green

    let changes = diff(newer, older);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, "labels");

    let old_slugs = match &changes[0].old {
        FieldValue::Members(entries) => service.resolve_member_slugs(entries).unwrap(),
        other => panic!("expected members, got {other:?}"),
    };
    let new_slugs = match &changes[0].new {
        FieldValue::Members(entries) => service.resolve_member_slugs(entries).unwrap(),
        other => panic!("expected members, got {other:?}"),
    };
    assert_eq!(old_slugs, vec!["red", "green"]);
    assert_eq!(new_slugs, vec!["red", "green", "blue"]);
}

#[test]
fn diffing_a_stored_snapshot_against_itself_is_empty() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));
    let document_id = build_timeline(&mut service);

    for snapshot in service.history(document_id).unwrap() {
        assert!(diff(&snapshot, &snapshot).is_empty());
    }
}

#[test]
fn every_adjacent_pair_differs_by_exactly_the_label_added_in_that_step() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));
    let document_id = build_timeline(&mut service);

    let history = service.history(document_id).unwrap();
    let expected_added = ["blue", "green", "red"];

    for (pair, added_slug) in history.windows(2).zip(expected_added) {
        let changes = diff(&pair[0], &pair[1]);
        assert_eq!(changes.len(), 1, "only the membership field may differ");

        let (old, new) = match (&changes[0].old, &changes[0].new) {
            (FieldValue::Members(old), FieldValue::Members(new)) => (old, new),
            other => panic!("expected membership values, got {other:?}"),
        };
        assert_eq!(new.len(), old.len() + 1);
        let added: Vec<_> = new.iter().filter(|entry| !old.contains(entry)).collect();
        assert_eq!(added.len(), 1);
        let slug = service
            .resolve_member_slugs(&[*added[0]])
            .unwrap()
            .remove(0);
        assert_eq!(slug, added_slug);
    }
}

#[test]
fn membership_entries_never_leak_across_documents() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));
    let first = build_timeline(&mut service);

    // A second document sharing a label must not disturb the first timeline.
    let second = service
        .create_document("doc two", &ChangeOptions::at(day(2024, 1, 15)))
        .unwrap();
    let red = service
        .list_labels()
        .unwrap()
        .into_iter()
        .find(|label| label.slug == "red")
        .unwrap();
    service
        .add_label(second.id, red.id, &ChangeOptions::at(day(2024, 2, 15)))
        .unwrap();

    let history = service.history(first).unwrap();
    assert_eq!(history.len(), 4);
    for snapshot in &history {
        assert!(snapshot
            .members
            .iter()
            .all(|entry| entry.document_id == first));
    }
    assert_eq!(diff(&history[0], &history[1]).len(), 1);
}

#[test]
fn scalar_rename_diff_reports_both_names() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));

    let document = service
        .create_document("doc one", &ChangeOptions::at(day(2024, 1, 1)))
        .unwrap();
    service
        .rename_document(document.id, "doc two", &ChangeOptions::at(day(2024, 2, 1)))
        .unwrap();

    let history = service.history(document.id).unwrap();
    let changes = diff(&history[0], &history[1]);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, "name");
    assert_eq!(changes[0].old, FieldValue::Text("doc one".to_string()));
    assert_eq!(changes[0].new, FieldValue::Text("doc two".to_string()));
}

#[test]
fn resolving_slugs_after_label_deletion_reports_dangling_entry() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));

    let document = service
        .create_document("doc one", &ChangeOptions::at(day(2024, 1, 1)))
        .unwrap();
    let (label, _snapshot) = service
        .attach_new_label(document.id, "red", &ChangeOptions::at(day(2024, 2, 1)))
        .unwrap();
    service
        .remove_label(document.id, label.id, &ChangeOptions::at(day(2024, 3, 1)))
        .unwrap();
    service.delete_label(label.id).unwrap();

    // The raw id pairs in old snapshots survive the deletion.
    let history = service.history(document.id).unwrap();
    let with_red = &history[1];
    assert_eq!(with_red.members.len(), 1);

    let err = service
        .resolve_member_slugs(&with_red.members)
        .unwrap_err();
    assert!(matches!(err, ServiceError::DanglingLabel(id) if id == label.id));
}

#[test]
fn snapshot_serializes_with_stable_field_names() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));
    let document_id = build_timeline(&mut service);

    let latest = service.latest(document_id).unwrap();
    let json = serde_json::to_value(&latest).unwrap();
    assert_eq!(json["document_id"], document_id);
    assert_eq!(json["kind"], "changed");
    assert_eq!(json["members"].as_array().unwrap().len(), 3);
    assert_eq!(json["members"][0]["document_id"], document_id);
}
