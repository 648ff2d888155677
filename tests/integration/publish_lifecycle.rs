use scriptorium::model::Metadata;
use scriptorium::publish::{publish, PublishRequest};
use scriptorium::store::{InMemoryStore, StoragePort};
use std::sync::Arc;

fn store() -> Arc<dyn StoragePort> {
    Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn publish_creates_version_and_deletes_draft() {
    let store = store();
    let note = store
        .create_note("Hello".into(), "A".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();

    let resp = publish(
        &store,
        PublishRequest {
            note_id: note.id.clone(),
            collections: vec![collection.id.clone()],
            label: None,
            client_token: "k".into(),
        },
    )
    .await
    .unwrap();

    assert_eq!(resp.status, "version_created");
    assert!(resp.estimated_searchable_in_ms <= 5000);

    let version = store.get_version(&resp.version_id).await.unwrap();
    assert_eq!(version.content_md, "A");

    let updated_note = store.get_note(&note.id).await.unwrap();
    assert_eq!(updated_note.current_version_id, Some(resp.version_id.clone()));

    assert!(store.get_draft(&note.id).await.is_err());

    let drained = store.drain_visibility_events(10).await.unwrap();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].version_id, resp.version_id);
    assert_eq!(format!("{:?}", drained[0].op), "Publish");
}

#[tokio::test]
async fn publish_rejects_empty_collections() {
    let store = store();
    let note = store
        .create_note("Hello".into(), "A".into(), Metadata::default())
        .await
        .unwrap();

    let err = publish(
        &store,
        PublishRequest {
            note_id: note.id,
            collections: vec![],
            label: None,
            client_token: "k".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, scriptorium::ScriptoriumError::Validation(_)));
}

#[tokio::test]
async fn publish_rejects_title_over_max_length() {
    let store = store();
    let long_title = "x".repeat(201);
    let err = store
        .create_note(long_title, "A".into(), Metadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, scriptorium::ScriptoriumError::Validation(_)));
}
