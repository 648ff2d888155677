use scriptorium::index::Corpus;
use scriptorium::model::Metadata;
use scriptorium::observability::MetricsRegistry;
use scriptorium::publish::{publish, PublishRequest};
use scriptorium::store::{InMemoryStore, StoragePort};
use scriptorium::visibility::{drain_and_commit, PipelinePolicy};
use std::sync::Arc;

fn store() -> Arc<dyn StoragePort> {
    Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn drain_commits_into_corpus() {
    let store = store();
    let corpus = Corpus::default();
    let metrics = MetricsRegistry::new();

    let note = store
        .create_note("T".into(), "# Heading\n\nHello world.".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();

    publish(
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

    assert!(!corpus.has_committed(&note.id));

    let report = drain_and_commit(&store, &corpus, &metrics, PipelinePolicy::default(), 10)
        .await
        .unwrap();
    assert_eq!(report.committed, 1);
    assert_eq!(report.parked, 0);
    assert!(corpus.has_committed(&note.id));
    assert!(corpus.total_passages() > 0);

    // Draining again with nothing pending commits nothing further.
    let report2 = drain_and_commit(&store, &corpus, &metrics, PipelinePolicy::default(), 10)
        .await
        .unwrap();
    assert_eq!(report2.committed, 0);
}

#[tokio::test]
async fn republishing_replaces_the_searchable_head_version() {
    let store = store();
    let corpus = Corpus::default();
    let metrics = MetricsRegistry::new();

    let note = store
        .create_note("T".into(), "# Heading\n\nFirst body.".into(), Metadata::default())
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
    drain_and_commit(&store, &corpus, &metrics, PipelinePolicy::default(), 10).await.unwrap();

    store.save_draft(&note.id, "# Heading\n\nSecond body revised.".into(), Metadata::default()).await.unwrap();
    publish(
        &store,
        PublishRequest {
            note_id: note.id.clone(),
            collections: vec![collection.id],
            label: None,
            client_token: "t2".into(),
        },
    )
    .await
    .unwrap();
    drain_and_commit(&store, &corpus, &metrics, PipelinePolicy::default(), 10).await.unwrap();

    let candidates = corpus.retrieve_candidates("second revised", None, 10);
    assert!(!candidates.is_empty());
    let candidates_old = corpus.retrieve_candidates("first body", None, 10);
    assert!(candidates_old.is_empty());
}
