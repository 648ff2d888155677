use scriptorium::model::Metadata;
use scriptorium::publish::{publish, rollback, PublishRequest, RollbackRequest};
use scriptorium::store::{InMemoryStore, StoragePort};
use std::sync::Arc;

fn store() -> Arc<dyn StoragePort> {
    Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn repeated_publish_token_returns_identical_response() {
    let store = store();
    let note = store
        .create_note("T".into(), "A".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();

    let req = || PublishRequest {
        note_id: note.id.clone(),
        collections: vec![collection.id.clone()],
        label: None,
        client_token: "same-key".into(),
    };

    let r1 = publish(&store, req()).await.unwrap();
    let r2 = publish(&store, req()).await.unwrap();
    assert_eq!(r1.version_id, r2.version_id);

    let history = store.list_versions(&note.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn reusing_a_publish_token_for_rollback_conflicts() {
    let store = store();
    let note = store
        .create_note("T".into(), "A".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();

    let p = publish(
        &store,
        PublishRequest {
            note_id: note.id.clone(),
            collections: vec![collection.id],
            label: None,
            client_token: "shared".into(),
        },
    )
    .await
    .unwrap();

    let err = rollback(
        &store,
        RollbackRequest {
            note_id: note.id,
            target_version_id: p.version_id,
            client_token: "shared".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, scriptorium::ScriptoriumError::Conflict(_)));
}

#[tokio::test]
async fn repeated_rollback_token_returns_identical_response() {
    let store = store();
    let note = store
        .create_note("T".into(), "A".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();
    let p = publish(
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

    let req = || RollbackRequest {
        note_id: note.id.clone(),
        target_version_id: p.version_id.clone(),
        client_token: "rollback-key".into(),
    };
    let r1 = rollback(&store, req()).await.unwrap();
    let r2 = rollback(&store, req()).await.unwrap();
    assert_eq!(r1.new_version_id, r2.new_version_id);

    let history = store.list_versions(&note.id).await.unwrap();
    assert_eq!(history.len(), 2);
}
