use scriptorium::model::{SessionStep, StepType};
use scriptorium::store::{InMemoryStore, StoragePort};
use std::sync::Arc;

fn store() -> Arc<dyn StoragePort> {
    Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn duplicate_collection_name_is_a_conflict() {
    let store = store();
    store.create_collection("Docs".into(), None).await.unwrap();
    let err = store.create_collection("Docs".into(), None).await.unwrap_err();
    assert!(matches!(err, scriptorium::ScriptoriumError::Conflict(_)));
}

#[tokio::test]
async fn reserved_collection_name_is_rejected() {
    let store = store();
    let err = store.create_collection("all".into(), None).await.unwrap_err();
    assert!(matches!(err, scriptorium::ScriptoriumError::Validation(_)));
}

#[tokio::test]
async fn session_steps_keep_ref_ids_after_target_deletion() {
    let store = store();
    let session = store.create_session().await.unwrap();
    let ghost_version_id = scriptorium::ids::Id::new(scriptorium::ids::IdKind::Version).to_string();

    store
        .append_session_steps(
            &session.id,
            vec![SessionStep {
                step_index: 0,
                timestamp: 0,
                step_type: StepType::Cite,
                ref_ids: vec![ghost_version_id.clone()],
            }],
        )
        .await
        .unwrap();

    let reloaded = store.get_session(&session.id).await.unwrap();
    assert_eq!(reloaded.steps.len(), 1);
    assert_eq!(reloaded.steps[0].ref_ids, vec![ghost_version_id]);
}

#[tokio::test]
async fn pinning_a_session_is_reflected_on_reload() {
    let store = store();
    let session = store.create_session().await.unwrap();
    assert!(!session.pinned);
    let pinned = store.pin_session(&session.id).await.unwrap();
    assert!(pinned.pinned);
    let reloaded = store.get_session(&session.id).await.unwrap();
    assert!(reloaded.pinned);
}
