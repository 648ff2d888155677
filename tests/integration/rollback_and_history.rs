use scriptorium::model::Metadata;
use scriptorium::publish::{publish, rollback, PublishRequest, RollbackRequest};
use scriptorium::store::{InMemoryStore, StoragePort};
use std::sync::Arc;

fn store() -> Arc<dyn StoragePort> {
    Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn rollback_creates_new_version_without_touching_target() {
    let store = store();
    let note = store
        .create_note("T".into(), "A".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();

    let p1 = publish(
        &store,
        PublishRequest {
            note_id: note.id.clone(),
            collections: vec![collection.id.clone()],
            label: None,
            client_token: "t1".into(),
        },
    )
    .await
    .unwrap();

    store.save_draft(&note.id, "B".into(), Metadata::default()).await.unwrap();
    let p2 = publish(
        &store,
        PublishRequest {
            note_id: note.id.clone(),
            collections: vec![collection.id.clone()],
            label: None,
            client_token: "t2".into(),
        },
    )
    .await
    .unwrap();

    let r = rollback(
        &store,
        RollbackRequest {
            note_id: note.id.clone(),
            target_version_id: p1.version_id.clone(),
            client_token: "t3".into(),
        },
    )
    .await
    .unwrap();

    let v3 = store.get_version(&r.new_version_id).await.unwrap();
    assert_eq!(v3.parent_version_id, Some(p1.version_id.clone()));
    assert_eq!(v3.content_md, "A");

    let v1 = store.get_version(&p1.version_id).await.unwrap();
    assert_eq!(v1.content_md, "A");
    assert!(v1.parent_version_id.is_none());

    let history = store.list_versions(&note.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id, r.new_version_id);
    assert_eq!(history[1].id, p2.version_id);
    assert_eq!(history[2].id, p1.version_id);

    // Versions.created_at strictly decreasing newest-first.
    assert!(history[0].created_at > history[1].created_at);
    assert!(history[1].created_at > history[2].created_at);
}

#[tokio::test]
async fn rollback_to_missing_version_is_not_found() {
    let store = store();
    let note = store
        .create_note("T".into(), "A".into(), Metadata::default())
        .await
        .unwrap();

    let err = rollback(
        &store,
        RollbackRequest {
            note_id: note.id,
            target_version_id: scriptorium::ids::Id::new(scriptorium::ids::IdKind::Version),
            client_token: "t".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, scriptorium::ScriptoriumError::NotFound { .. }));
}

#[tokio::test]
async fn deleting_a_note_preserves_published_history() {
    let store = store();
    let note = store
        .create_note("T".into(), "A".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();
    let p1 = publish(
        &store,
        PublishRequest {
            note_id: note.id.clone(),
            collections: vec![collection.id],
            label: None,
            client_token: "t1".into(),
        },
    )
    .await
    .unwrap();

    store.delete_note(&note.id).await.unwrap();
    assert!(store.get_note(&note.id).await.is_err());
    let version = store.get_version(&p1.version_id).await.unwrap();
    assert_eq!(version.content_md, "A");
}
