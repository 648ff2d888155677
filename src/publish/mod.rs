//! Publish/Rollback coordinator.
//!
//! A two-phase state machine — Received -> Validated -> Versioned -> Visible
//! — that is idempotent by client token and runs its Versioned step as one
//! atomic transaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScriptoriumError};
use crate::ids::Id;
use crate::model::{VersionLabel, MAX_COLLECTIONS_PER_NOTE};
use crate::store::idempotency::IdempotentOutcome;
use crate::store::{PublishCommit, RollbackCommit, StoragePort};

/// Fixed estimate rather than a function of queue depth; revisit if the
/// pipeline's observed P95 latency regresses.
pub const ESTIMATED_SEARCHABLE_IN_MS: u64 = 5000;

/// Generous upper bound on draft/version body size, chosen generously
/// enough that no real note trips it while still rejecting pathological
/// input.
pub const MAX_BODY_CHARS: usize = 2_000_000;

#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    pub note_id: Id,
    pub collections: Vec<Id>,
    pub label: Option<VersionLabel>,
    pub client_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub version_id: Id,
    pub status: String,
    pub estimated_searchable_in_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollbackRequest {
    pub note_id: Id,
    pub target_version_id: Id,
    pub client_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackResponse {
    pub new_version_id: Id,
    pub target_version_id: Id,
    pub status: String,
}

/// Publishes a Note's current Draft into one or more Collections.
///
/// 1. Received: idempotency lookup.
/// 2. Validated: title/body/collections checks.
/// 3. Versioned: one atomic commit (Version + Publication + memberships +
///    draft deletion + current_version_id stamp + idempotency record +
///    enqueued VisibilityEvent).
/// 4. Visible: response carries the fixed searchability estimate.
pub async fn publish(store: &Arc<dyn StoragePort>, req: PublishRequest) -> Result<PublishResponse> {
    if let Some(outcome) = store.lookup_idempotent(&req.note_id, &req.client_token).await? {
        return match outcome {
            IdempotentOutcome::Publish(resp) => Ok(resp),
            IdempotentOutcome::Rollback(_) => Err(ScriptoriumError::Conflict(
                "client_token was already used for a rollback".into(),
            )),
        };
    }

    let note = store.get_note(&req.note_id).await?;
    let draft = store.get_draft(&req.note_id).await?;

    crate::model::validate_title(&note.title).map_err(ScriptoriumError::Validation)?;
    if draft.body_md.chars().count() > MAX_BODY_CHARS {
        return Err(ScriptoriumError::Validation("draft body exceeds the maximum length".into()));
    }
    if req.collections.is_empty() {
        return Err(ScriptoriumError::Validation(
            "publish requires at least one collection".into(),
        ));
    }
    if req.collections.len() > MAX_COLLECTIONS_PER_NOTE {
        return Err(ScriptoriumError::Validation(format!(
            "at most {MAX_COLLECTIONS_PER_NOTE} collections are allowed per note"
        )));
    }
    if req.collections.iter().collect::<std::collections::HashSet<_>>().len() != req.collections.len() {
        return Err(ScriptoriumError::Validation(
            "collections must not contain duplicates".into(),
        ));
    }
    for collection_id in &req.collections {
        store.get_collection(collection_id).await?;
    }
    draft.metadata.validate().map_err(ScriptoriumError::Validation)?;

    let (version, _publication, _event) = store
        .commit_publish(PublishCommit {
            note_id: &req.note_id,
            content_md: draft.body_md,
            metadata: draft.metadata,
            collections: req.collections,
            label: req.label,
            client_token: req.client_token,
        })
        .await?;

    Ok(PublishResponse {
        version_id: version.id,
        status: "version_created".to_string(),
        estimated_searchable_in_ms: ESTIMATED_SEARCHABLE_IN_MS,
    })
}

/// Rolls a Note back to a prior Version by creating a new Version whose
/// content equals the target's. History is never deleted.
pub async fn rollback(store: &Arc<dyn StoragePort>, req: RollbackRequest) -> Result<RollbackResponse> {
    if let Some(outcome) = store.lookup_idempotent(&req.note_id, &req.client_token).await? {
        return match outcome {
            IdempotentOutcome::Rollback(resp) => Ok(resp),
            IdempotentOutcome::Publish(_) => Err(ScriptoriumError::Conflict(
                "client_token was already used for a publish".into(),
            )),
        };
    }

    store.get_note(&req.note_id).await?;
    let target = store.get_version(&req.target_version_id).await?;
    if target.note_id != req.note_id {
        return Err(ScriptoriumError::Validation(
            "target_version_id does not belong to note_id".into(),
        ));
    }

    let (version, _publication, _event) = store
        .commit_rollback(RollbackCommit {
            note_id: &req.note_id,
            target_version_id: &req.target_version_id,
            client_token: req.client_token,
        })
        .await?;

    Ok(RollbackResponse {
        new_version_id: version.id,
        target_version_id: req.target_version_id,
        status: "version_created".to_string(),
    })
}
