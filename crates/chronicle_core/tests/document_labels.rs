use chronicle_core::db::open_db_in_memory;
use chronicle_core::{
    ChangeOptions, DocumentService, RepoError, ServiceError, SqliteDocumentRepository,
};

#[test]
fn add_and_remove_label_record_membership_snapshots() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));

    let document = service
        .create_document("doc one", &ChangeOptions::default())
        .unwrap();
    let label = service.create_label("red").unwrap();

    let after_add = service
        .add_label(document.id, label.id, &ChangeOptions::default())
        .unwrap();
    assert_eq!(after_add.members.len(), 1);
    assert_eq!(after_add.members[0].label_id, label.id);
    assert_eq!(after_add.members[0].document_id, document.id);

    let after_remove = service
        .remove_label(document.id, label.id, &ChangeOptions::default())
        .unwrap();
    assert!(after_remove.members.is_empty());

    // created + add + remove
    assert_eq!(service.history(document.id).unwrap().len(), 3);
}

#[test]
fn duplicate_link_add_is_an_integrity_error() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));

    let document = service
        .create_document("doc one", &ChangeOptions::default())
        .unwrap();
    let label = service.create_label("red").unwrap();
    service
        .add_label(document.id, label.id, &ChangeOptions::default())
        .unwrap();

    let err = service
        .add_label(document.id, label.id, &ChangeOptions::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Repo(RepoError::Integrity(_))));

    // The failed add must not have appended a snapshot.
    assert_eq!(service.history(document.id).unwrap().len(), 2);
}

#[test]
fn removing_absent_link_reports_link_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));

    let document = service
        .create_document("doc one", &ChangeOptions::default())
        .unwrap();
    let label = service.create_label("red").unwrap();

    let err = service
        .remove_label(document.id, label.id, &ChangeOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::LinkNotFound { .. })
    ));
}

#[test]
fn referenced_label_cannot_be_deleted_until_link_is_removed() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));

    let document = service
        .create_document("doc one", &ChangeOptions::default())
        .unwrap();
    let (label, _snapshot) = service
        .attach_new_label(document.id, "red", &ChangeOptions::default())
        .unwrap();

    let err = service.delete_label(label.id).unwrap_err();
    assert!(matches!(err, RepoError::Integrity(_)));

    service
        .remove_label(document.id, label.id, &ChangeOptions::default())
        .unwrap();
    service.delete_label(label.id).unwrap();

    // The removal produced a snapshot excluding the label.
    let latest = service.latest(document.id).unwrap();
    assert!(latest.members.is_empty());
}

#[test]
fn deleting_document_cascades_links_but_not_labels() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));
        let document = service
            .create_document("doc one", &ChangeOptions::default())
            .unwrap();
        service
            .attach_new_label(document.id, "red", &ChangeOptions::default())
            .unwrap();
        service
            .delete_document(document.id, &ChangeOptions::default())
            .unwrap();
    }

    let live_links: i64 = conn
        .query_row("SELECT COUNT(*) FROM document_labels;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(live_links, 0);

    let labels: i64 = conn
        .query_row("SELECT COUNT(*) FROM labels;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(labels, 1);
}

#[test]
fn labels_for_lists_current_membership_in_label_id_order() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = DocumentService::new(SqliteDocumentRepository::new(&mut conn));

    let document = service
        .create_document("doc one", &ChangeOptions::default())
        .unwrap();
    service
        .attach_new_label(document.id, "red", &ChangeOptions::default())
        .unwrap();
    service
        .attach_new_label(document.id, "green", &ChangeOptions::default())
        .unwrap();

    let linked = service.labels_for(document.id).unwrap();
    let slugs: Vec<&str> = linked.iter().map(|label| label.slug.as_str()).collect();
    assert_eq!(slugs, vec!["red", "green"]);

    let all = service.list_labels().unwrap();
    let all_slugs: Vec<&str> = all.iter().map(|label| label.slug.as_str()).collect();
    assert_eq!(all_slugs, vec!["green", "red"]);
}
