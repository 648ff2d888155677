use scriptorium::config::Config;
use scriptorium::index::Corpus;
use scriptorium::model::Metadata;
use scriptorium::observability::MetricsRegistry;
use scriptorium::publish::{publish, PublishRequest};
use scriptorium::query::{search, NoAnswerReason, SearchRequest};
use scriptorium::store::{InMemoryStore, StoragePort};
use scriptorium::visibility::{drain_and_commit, PipelinePolicy};
use std::sync::Arc;

fn store() -> Arc<dyn StoragePort> {
    Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn search_before_commit_reports_not_indexed() {
    let store = store();
    let corpus = Corpus::default();
    let metrics = MetricsRegistry::new();
    let config = Config::default();

    let note = store
        .create_note("T".into(), "# Heading\n\nHello world greeting.".into(), Metadata::default())
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

    let resp = search(
        &store,
        &corpus,
        &metrics,
        &config,
        SearchRequest {
            query: "hello".into(),
            collections: Some(vec![collection.id]),
            page: 0,
            page_size: None,
        },
    )
    .await
    .unwrap();

    assert!(resp.results.is_empty());
    assert_eq!(resp.no_answer_reason, Some(NoAnswerReason::NotIndexed));
}

#[tokio::test]
async fn search_after_commit_returns_scoped_result_and_citation() {
    let store = store();
    let corpus = Corpus::default();
    let metrics = MetricsRegistry::new();
    let config = Config::default();

    let note = store
        .create_note("T".into(), "# Heading\n\nHello world greeting text.".into(), Metadata::default())
        .await
        .unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();
    let other_collection = store.create_collection("c2".into(), None).await.unwrap();
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

    let resp = search(
        &store,
        &corpus,
        &metrics,
        &config,
        SearchRequest {
            query: "hello world greeting".into(),
            collections: Some(vec![collection.id.clone()]),
            page: 0,
            page_size: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(resp.results.len(), 1);
    assert_eq!(resp.results[0].note_id, note.id);
    assert!(resp.answer.is_some());
    assert!(!resp.citations.is_empty());

    let scoped_out = search(
        &store,
        &corpus,
        &metrics,
        &config,
        SearchRequest {
            query: "hello world greeting".into(),
            collections: Some(vec![other_collection.id]),
            page: 0,
            page_size: None,
        },
    )
    .await
    .unwrap();
    assert!(scoped_out.results.is_empty());
}

#[tokio::test]
async fn search_with_no_published_notes_reports_no_published_versions() {
    let store = store();
    let corpus = Corpus::default();
    let metrics = MetricsRegistry::new();
    let config = Config::default();

    let resp = search(
        &store,
        &corpus,
        &metrics,
        &config,
        SearchRequest {
            query: "anything".into(),
            collections: None,
            page: 0,
            page_size: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(resp.no_answer_reason, Some(NoAnswerReason::NoPublishedVersions));
}
