use scriptorium::anchor::chunker::{self, ChunkerConfig};
use scriptorium::anchor::Anchor;
use scriptorium::model::Metadata;
use scriptorium::publish::{publish, PublishRequest};
use scriptorium::store::{InMemoryStore, StoragePort};
use std::sync::Arc;

fn store() -> Arc<dyn StoragePort> {
    Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn anchor_resolves_against_the_version_it_was_minted_from() {
    let store = store();
    let content = "# Heading\n\nA stable passage that will not move around.";
    let note = store.create_note("T".into(), content.into(), Metadata::default()).await.unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();
    let publication = publish(
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

    let chunks = chunker::chunk(content, ChunkerConfig::default()).unwrap();
    let anchor = Anchor::mint(&chunks[0]);

    let text = store
        .resolve_anchor_text(&publication.version_id, &anchor)
        .await
        .unwrap();
    assert!(text.is_some());
    assert!(text.unwrap().contains("stable passage"));
}

#[tokio::test]
async fn anchor_drifts_when_a_later_version_edits_the_section() {
    let store = store();
    let original = "# Heading\n\nOriginal sentence right here for anchoring.";
    let note = store.create_note("T".into(), original.into(), Metadata::default()).await.unwrap();
    let collection = store.create_collection("c1".into(), None).await.unwrap();
    let first = publish(
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

    let chunks = chunker::chunk(original, ChunkerConfig::default()).unwrap();
    let anchor = Anchor::mint(&chunks[0]);

    let edited = "# Heading\n\nCompletely rewritten sentence sits here instead.";
    store.save_draft(&note.id, edited.into(), Metadata::default()).await.unwrap();
    let second = publish(
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

    // Anchor still resolves cleanly against the version it was minted from.
    let text_on_first = store.resolve_anchor_text(&first.version_id, &anchor).await.unwrap();
    assert!(text_on_first.is_some());

    // Against the edited version the exact fingerprint no longer matches;
    // resolve_anchor_text degrades gracefully rather than erroring.
    let text_on_second = store.resolve_anchor_text(&second.version_id, &anchor).await.unwrap();
    assert_ne!(text_on_second, text_on_first);
}

#[tokio::test]
async fn anchor_is_unresolved_against_emptied_content() {
    let store = store();
    let original = "# Heading\n\nSome passage text goes here for anchoring purposes.";
    let note = store.create_note("T".into(), original.into(), Metadata::default()).await.unwrap();
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

    let chunks = chunker::chunk(original, ChunkerConfig::default()).unwrap();
    let anchor = Anchor::mint(&chunks[0]);

    store.save_draft(&note.id, "   ".into(), Metadata::default()).await.unwrap();
    let second = publish(
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

    let text = store.resolve_anchor_text(&second.version_id, &anchor).await.unwrap();
    assert!(text.is_none());
}
