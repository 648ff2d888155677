use scriptorium::model::Metadata;
use scriptorium::publish::{publish, PublishRequest};
use scriptorium::store::{InMemoryStore, StoragePort};
use std::sync::Arc;

fn store() -> Arc<dyn StoragePort> {
    Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn restoring_a_snapshot_undoes_later_mutations() {
    let store = store();
    let note = store
        .create_note("T".into(), "A".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();
    publish(
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

    let snapshot = store.create_snapshot("workspace".into(), None).await.unwrap();

    let second_note = store
        .create_note("Second".into(), "B".into(), Metadata::default())
        .await
        .unwrap();
    store.create_collection("c2".into(), None).await.unwrap();

    assert!(store.get_note(&second_note.id).await.is_ok());

    store.restore_snapshot(&snapshot.id).await.unwrap();

    assert!(store.get_note(&second_note.id).await.is_err());
    assert!(store.get_note(&note.id).await.is_ok());
    assert!(store.get_collection_by_name("c2").await.unwrap().is_none());
    assert!(store.get_collection_by_name("c1").await.unwrap().is_some());
}

#[tokio::test]
async fn snapshots_list_in_creation_order_and_are_deletable() {
    let store = store();
    let s1 = store.create_snapshot("workspace".into(), Some("first".into())).await.unwrap();
    let s2 = store.create_snapshot("workspace".into(), Some("second".into())).await.unwrap();

    let listed = store.list_snapshots().await.unwrap();
    assert_eq!(listed.iter().map(|s| s.id.clone()).collect::<Vec<_>>(), vec![s1.id.clone(), s2.id.clone()]);

    store.delete_snapshot(&s1.id).await.unwrap();
    let listed = store.list_snapshots().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, s2.id);
}

#[tokio::test]
async fn restoring_a_missing_snapshot_is_not_found() {
    let store = store();
    let err = store
        .restore_snapshot(&scriptorium::ids::Id::new(scriptorium::ids::IdKind::Snapshot))
        .await
        .unwrap_err();
    assert!(matches!(err, scriptorium::ScriptoriumError::NotFound { .. }));
}
