//! In-memory [`StoragePort`] implementation.
//!
//! All state lives behind one `tokio::sync::RwLock`, so the "atomic commit"
//! methods below are simply functions that hold the write guard for their
//! whole body rather than a general transaction API — see the module doc on
//! `store::mod` for why that's the right shape here.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::anchor::{self, Anchor};
use crate::error::{Result, ScriptoriumError};
use crate::ids::{Id, IdKind, MonotonicClock};
use crate::model::{
    Collection, Draft, ListOptions, Metadata, Note, NoteFilter, Publication, Session,
    SessionStep, Snapshot, SnapshotState, Version, VersionLabel, MAX_COLLECTIONS_PER_NOTE,
};
use crate::visibility::{VisibilityEvent, VisibilityOp};

use super::idempotency::{IdempotencyEntry, IdempotentOutcome};
use super::{MaintenanceReport, PublishCommit, RollbackCommit, StorageHealth, StoragePort};

#[derive(Default)]
struct WorkspaceState {
    notes: HashMap<Id, Note>,
    drafts: HashMap<Id, Draft>,
    versions: HashMap<Id, Version>,
    /// Newest-first per note, matching how history is always read back.
    versions_by_note: HashMap<Id, Vec<Id>>,
    collections: HashMap<Id, Collection>,
    collections_by_name: HashMap<String, Id>,
    memberships: HashMap<Id, Vec<Id>>, // note_id -> collection_ids
    publications: HashMap<Id, Publication>,
    sessions: HashMap<Id, Session>,
    snapshots: HashMap<Id, Snapshot>,
    snapshot_order: Vec<Id>,
    idempotency: HashMap<(Id, String), IdempotencyEntry>,
    outbox: VecDeque<VisibilityEvent>,
    dedup_seen: HashSet<(Id, VisibilityOp)>,
    clock: MonotonicClock,
}

/// The sole storage backend shipped here. A relational backend would
/// implement the same [`StoragePort`] trait without any caller-visible
/// difference.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<WorkspaceState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn content_hash(content_md: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_md.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl StoragePort for InMemoryStore {
    async fn create_note(
        &self,
        title: String,
        initial_content: String,
        metadata: Metadata,
    ) -> Result<Note> {
        crate::model::validate_title(&title).map_err(ScriptoriumError::Validation)?;
        metadata.validate().map_err(ScriptoriumError::Validation)?;

        let mut state = self.state.write().await;
        let now = state.clock.tick();
        let note_id = Id::new(IdKind::Note);

        let note = Note {
            id: note_id.clone(),
            title,
            metadata: metadata.clone(),
            created_at: now,
            updated_at: now,
            current_version_id: None,
        };
        let draft = Draft {
            note_id: note_id.clone(),
            body_md: initial_content,
            metadata,
            autosave_ts: now,
        };
        state.notes.insert(note_id.clone(), note.clone());
        state.drafts.insert(note_id, draft);
        Ok(note)
    }

    async fn get_note(&self, id: &Id) -> Result<Note> {
        self.state
            .read()
            .await
            .notes
            .get(id)
            .cloned()
            .ok_or_else(|| ScriptoriumError::not_found("note", id.to_string()))
    }

    async fn list_notes(&self, filter: NoteFilter, options: ListOptions) -> Result<Vec<Note>> {
        let state = self.state.read().await;
        let mut notes: Vec<Note> = state
            .notes
            .values()
            .filter(|n| match &filter.tag {
                Some(tag) => n.metadata.tags.iter().any(|t| t == tag),
                None => true,
            })
            .filter(|n| match &filter.collection_id {
                Some(collection_id) => state
                    .memberships
                    .get(&n.id)
                    .map(|cols| cols.contains(collection_id))
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect();
        notes.sort_by(|a, b| a.id.cmp(&b.id));
        let notes = notes.into_iter().skip(options.offset);
        Ok(match options.limit {
            Some(limit) => notes.take(limit).collect(),
            None => notes.collect(),
        })
    }

    async fn update_note_metadata(&self, id: &Id, metadata: Metadata) -> Result<Note> {
        metadata.validate().map_err(ScriptoriumError::Validation)?;
        let mut state = self.state.write().await;
        let now = state.clock.tick();
        let note = state
            .notes
            .get_mut(id)
            .ok_or_else(|| ScriptoriumError::not_found("note", id.to_string()))?;
        note.metadata = metadata;
        note.updated_at = now;
        Ok(note.clone())
    }

    async fn delete_note(&self, id: &Id) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.notes.contains_key(id) {
            return Err(ScriptoriumError::not_found("note", id.to_string()));
        }
        // Versions, publications, and memberships are the note's durable
        // history and stay behind, reachable only through them.
        state.notes.remove(id);
        state.drafts.remove(id);
        Ok(())
    }

    async fn save_draft(&self, note_id: &Id, body_md: String, metadata: Metadata) -> Result<Draft> {
        metadata.validate().map_err(ScriptoriumError::Validation)?;
        let mut state = self.state.write().await;
        if !state.notes.contains_key(note_id) {
            return Err(ScriptoriumError::not_found("note", note_id.to_string()));
        }
        let now = state.clock.tick();
        let draft = Draft {
            note_id: note_id.clone(),
            body_md,
            metadata,
            autosave_ts: now,
        };
        state.drafts.insert(note_id.clone(), draft.clone());
        Ok(draft)
    }

    async fn get_draft(&self, note_id: &Id) -> Result<Draft> {
        self.state
            .read()
            .await
            .drafts
            .get(note_id)
            .cloned()
            .ok_or_else(|| ScriptoriumError::not_found("draft", note_id.to_string()))
    }

    async fn get_version(&self, id: &Id) -> Result<Version> {
        self.state
            .read()
            .await
            .versions
            .get(id)
            .cloned()
            .ok_or_else(|| ScriptoriumError::not_found("version", id.to_string()))
    }

    async fn list_versions(&self, note_id: &Id) -> Result<Vec<Version>> {
        let state = self.state.read().await;
        let ids = state.versions_by_note.get(note_id).cloned().unwrap_or_default();
        Ok(ids.into_iter().filter_map(|id| state.versions.get(&id).cloned()).collect())
    }

    async fn get_current_version(&self, note_id: &Id) -> Result<Version> {
        let state = self.state.read().await;
        let note = state
            .notes
            .get(note_id)
            .ok_or_else(|| ScriptoriumError::not_found("note", note_id.to_string()))?;
        let version_id = note
            .current_version_id
            .as_ref()
            .ok_or_else(|| ScriptoriumError::not_found("version", "note has never been published"))?;
        state
            .versions
            .get(version_id)
            .cloned()
            .ok_or_else(|| ScriptoriumError::not_found("version", version_id.to_string()))
    }

    async fn create_collection(&self, name: String, description: Option<String>) -> Result<Collection> {
        Collection::validate_name(&name).map_err(ScriptoriumError::Validation)?;
        let mut state = self.state.write().await;
        if state.collections_by_name.contains_key(&name) {
            return Err(ScriptoriumError::Conflict(format!(
                "collection '{name}' already exists"
            )));
        }
        let now = state.clock.tick();
        let collection = Collection {
            id: Id::new(IdKind::Collection),
            name: name.clone(),
            description,
            created_at: now,
        };
        state.collections_by_name.insert(name, collection.id.clone());
        state.collections.insert(collection.id.clone(), collection.clone());
        Ok(collection)
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let mut collections: Vec<Collection> = self.state.read().await.collections.values().cloned().collect();
        collections.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(collections)
    }

    async fn get_collection(&self, id: &Id) -> Result<Collection> {
        self.state
            .read()
            .await
            .collections
            .get(id)
            .cloned()
            .ok_or_else(|| ScriptoriumError::not_found("collection", id.to_string()))
    }

    async fn get_collection_by_name(&self, name: &str) -> Result<Option<Collection>> {
        let state = self.state.read().await;
        Ok(state
            .collections_by_name
            .get(name)
            .and_then(|id| state.collections.get(id))
            .cloned())
    }

    async fn update_collection(&self, id: &Id, description: Option<String>) -> Result<Collection> {
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .get_mut(id)
            .ok_or_else(|| ScriptoriumError::not_found("collection", id.to_string()))?;
        collection.description = description;
        Ok(collection.clone())
    }

    async fn delete_collection(&self, id: &Id) -> Result<()> {
        let mut state = self.state.write().await;
        let collection = state
            .collections
            .remove(id)
            .ok_or_else(|| ScriptoriumError::not_found("collection", id.to_string()))?;
        state.collections_by_name.remove(&collection.name);
        for cols in state.memberships.values_mut() {
            cols.retain(|c| c != id);
        }
        Ok(())
    }

    async fn collections_for_note(&self, note_id: &Id) -> Result<Vec<Id>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .get(note_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_session(&self) -> Result<Session> {
        let mut state = self.state.write().await;
        let now = state.clock.tick();
        let session = Session {
            id: Id::new(IdKind::Session),
            created_at: now,
            pinned: false,
            steps: Vec::new(),
        };
        state.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn append_session_steps(&self, id: &Id, steps: Vec<SessionStep>) -> Result<Session> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| ScriptoriumError::not_found("session", id.to_string()))?;
        session.steps.extend(steps);
        Ok(session.clone())
    }

    async fn get_session(&self, id: &Id) -> Result<Session> {
        self.state
            .read()
            .await
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| ScriptoriumError::not_found("session", id.to_string()))
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.state.read().await.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(sessions)
    }

    async fn pin_session(&self, id: &Id) -> Result<Session> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| ScriptoriumError::not_found("session", id.to_string()))?;
        session.pinned = true;
        Ok(session.clone())
    }

    async fn create_snapshot(&self, scope: String, description: Option<String>) -> Result<Snapshot> {
        let mut state = self.state.write().await;
        let now = state.clock.tick();
        let memberships = state
            .memberships
            .iter()
            .flat_map(|(note_id, cols)| cols.iter().map(move |c| (note_id.clone(), c.clone())))
            .collect();
        let snapshot_state = SnapshotState {
            notes: state.notes.values().cloned().collect(),
            drafts: state.drafts.values().cloned().collect(),
            versions: state.versions.values().cloned().collect(),
            collections: state.collections.values().cloned().collect(),
            publications: state.publications.values().cloned().collect(),
            memberships,
        };
        let snapshot = Snapshot {
            id: Id::new(IdKind::Snapshot),
            scope,
            description,
            created_at: now,
            state: snapshot_state,
        };
        state.snapshots.insert(snapshot.id.clone(), snapshot.clone());
        state.snapshot_order.push(snapshot.id.clone());
        Ok(snapshot)
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let state = self.state.read().await;
        Ok(state
            .snapshot_order
            .iter()
            .filter_map(|id| state.snapshots.get(id).cloned())
            .collect())
    }

    async fn restore_snapshot(&self, id: &Id) -> Result<()> {
        let mut state = self.state.write().await;
        let snapshot = state
            .snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| ScriptoriumError::not_found("snapshot", id.to_string()))?;

        state.notes = snapshot.state.notes.into_iter().map(|n| (n.id.clone(), n)).collect();
        state.drafts = snapshot
            .state
            .drafts
            .into_iter()
            .map(|d| (d.note_id.clone(), d))
            .collect();
        state.versions = snapshot
            .state
            .versions
            .into_iter()
            .map(|v| (v.id.clone(), v))
            .collect();
        state.versions_by_note.clear();
        let mut by_note: HashMap<Id, Vec<(u64, Id)>> = HashMap::new();
        for version in state.versions.values() {
            by_note
                .entry(version.note_id.clone())
                .or_default()
                .push((version.created_at, version.id.clone()));
        }
        for (note_id, mut entries) in by_note {
            entries.sort_by(|a, b| b.0.cmp(&a.0));
            state
                .versions_by_note
                .insert(note_id, entries.into_iter().map(|(_, id)| id).collect());
        }
        state.collections = snapshot
            .state
            .collections
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        state.collections_by_name = state
            .collections
            .values()
            .map(|c| (c.name.clone(), c.id.clone()))
            .collect();
        state.publications = snapshot
            .state
            .publications
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        state.memberships.clear();
        for (note_id, collection_id) in snapshot.state.memberships {
            state.memberships.entry(note_id).or_default().push(collection_id);
        }
        Ok(())
    }

    async fn delete_snapshot(&self, id: &Id) -> Result<()> {
        let mut state = self.state.write().await;
        if state.snapshots.remove(id).is_none() {
            return Err(ScriptoriumError::not_found("snapshot", id.to_string()));
        }
        state.snapshot_order.retain(|existing| existing != id);
        Ok(())
    }

    async fn lookup_idempotent(&self, note_id: &Id, client_token: &str) -> Result<Option<IdempotentOutcome>> {
        Ok(self
            .state
            .read()
            .await
            .idempotency
            .get(&(note_id.clone(), client_token.to_string()))
            .map(|entry| entry.outcome.clone()))
    }

    async fn commit_publish(&self, commit: PublishCommit<'_>) -> Result<(Version, Publication, VisibilityEvent)> {
        let mut state = self.state.write().await;
        let key = (commit.note_id.clone(), commit.client_token.clone());
        if let Some(entry) = state.idempotency.get(&key) {
            if let IdempotentOutcome::Publish(resp) = &entry.outcome {
                let version = state
                    .versions
                    .get(&resp.version_id)
                    .cloned()
                    .ok_or_else(|| ScriptoriumError::Integrity("idempotent version vanished".into()))?;
                let publication = state
                    .publications
                    .values()
                    .find(|p| p.version_id == version.id)
                    .cloned()
                    .ok_or_else(|| ScriptoriumError::Integrity("idempotent publication vanished".into()))?;
                let event = VisibilityEvent {
                    version_id: version.id.clone(),
                    note_id: commit.note_id.clone(),
                    collections: publication.collections.clone(),
                    op: VisibilityOp::Publish,
                    enqueued_at_millis: publication.published_at,
                };
                return Ok((version, publication, event));
            }
            return Err(ScriptoriumError::Conflict(
                "client_token was already used for a rollback".into(),
            ));
        }

        if commit.collections.len() > MAX_COLLECTIONS_PER_NOTE {
            return Err(ScriptoriumError::Validation(format!(
                "at most {MAX_COLLECTIONS_PER_NOTE} collections are allowed per note"
            )));
        }
        for collection_id in &commit.collections {
            if !state.collections.contains_key(collection_id) {
                return Err(ScriptoriumError::not_found("collection", collection_id.to_string()));
            }
        }

        let now = state.clock.tick();
        let parent_version_id = state
            .notes
            .get(commit.note_id)
            .ok_or_else(|| ScriptoriumError::not_found("note", commit.note_id.to_string()))?
            .current_version_id
            .clone();

        let version = Version {
            id: Id::new(IdKind::Version),
            note_id: commit.note_id.clone(),
            content_hash: content_hash(&commit.content_md),
            content_md: commit.content_md,
            metadata: commit.metadata,
            created_at: now,
            parent_version_id,
            label: commit.label.unwrap_or_default(),
        };

        let publication = Publication {
            id: Id::new(IdKind::Publication),
            note_id: commit.note_id.clone(),
            version_id: version.id.clone(),
            collections: commit.collections.clone(),
            published_at: now,
            label: version.label,
        };

        let event = VisibilityEvent {
            version_id: version.id.clone(),
            note_id: commit.note_id.clone(),
            collections: commit.collections.clone(),
            op: VisibilityOp::Publish,
            enqueued_at_millis: now,
        };

        state.versions.insert(version.id.clone(), version.clone());
        state
            .versions_by_note
            .entry(commit.note_id.clone())
            .or_default()
            .insert(0, version.id.clone());
        state.publications.insert(publication.id.clone(), publication.clone());
        state
            .memberships
            .insert(commit.note_id.clone(), commit.collections.clone());
        if let Some(note) = state.notes.get_mut(commit.note_id) {
            note.current_version_id = Some(version.id.clone());
            note.updated_at = now;
        }
        state.drafts.remove(commit.note_id);

        if state.dedup_seen.insert(event.dedup_key()) {
            state.outbox.push_back(event.clone());
        }

        let response = crate::publish::PublishResponse {
            version_id: version.id.clone(),
            status: "version_created".to_string(),
            estimated_searchable_in_ms: crate::publish::ESTIMATED_SEARCHABLE_IN_MS,
        };
        state.idempotency.insert(
            key,
            IdempotencyEntry {
                outcome: IdempotentOutcome::Publish(response),
                recorded_at_millis: now,
            },
        );

        Ok((version, publication, event))
    }

    async fn commit_rollback(&self, commit: RollbackCommit<'_>) -> Result<(Version, Publication, VisibilityEvent)> {
        let mut state = self.state.write().await;
        let key = (commit.note_id.clone(), commit.client_token.clone());
        if let Some(entry) = state.idempotency.get(&key) {
            if let IdempotentOutcome::Rollback(resp) = &entry.outcome {
                let version = state
                    .versions
                    .get(&resp.new_version_id)
                    .cloned()
                    .ok_or_else(|| ScriptoriumError::Integrity("idempotent version vanished".into()))?;
                let publication = state
                    .publications
                    .values()
                    .find(|p| p.version_id == version.id)
                    .cloned()
                    .ok_or_else(|| ScriptoriumError::Integrity("idempotent publication vanished".into()))?;
                let event = VisibilityEvent {
                    version_id: version.id.clone(),
                    note_id: commit.note_id.clone(),
                    collections: publication.collections.clone(),
                    op: VisibilityOp::Rollback,
                    enqueued_at_millis: publication.published_at,
                };
                return Ok((version, publication, event));
            }
            return Err(ScriptoriumError::Conflict(
                "client_token was already used for a publish".into(),
            ));
        }

        let target = state
            .versions
            .get(commit.target_version_id)
            .cloned()
            .ok_or_else(|| ScriptoriumError::not_found("version", commit.target_version_id.to_string()))?;
        let collections = state
            .memberships
            .get(commit.note_id)
            .cloned()
            .unwrap_or_default();

        let now = state.clock.tick();
        let version = Version {
            id: Id::new(IdKind::Version),
            note_id: commit.note_id.clone(),
            content_md: target.content_md.clone(),
            metadata: target.metadata.clone(),
            content_hash: target.content_hash.clone(),
            created_at: now,
            parent_version_id: Some(target.id.clone()),
            label: VersionLabel::Major,
        };
        let publication = Publication {
            id: Id::new(IdKind::Publication),
            note_id: commit.note_id.clone(),
            version_id: version.id.clone(),
            collections: collections.clone(),
            published_at: now,
            label: version.label,
        };
        let event = VisibilityEvent {
            version_id: version.id.clone(),
            note_id: commit.note_id.clone(),
            collections,
            op: VisibilityOp::Rollback,
            enqueued_at_millis: now,
        };

        state.versions.insert(version.id.clone(), version.clone());
        state
            .versions_by_note
            .entry(commit.note_id.clone())
            .or_default()
            .insert(0, version.id.clone());
        state.publications.insert(publication.id.clone(), publication.clone());
        if let Some(note) = state.notes.get_mut(commit.note_id) {
            note.current_version_id = Some(version.id.clone());
            note.updated_at = now;
        }

        if state.dedup_seen.insert(event.dedup_key()) {
            state.outbox.push_back(event.clone());
        }

        let response = crate::publish::RollbackResponse {
            new_version_id: version.id.clone(),
            target_version_id: target.id.clone(),
            status: "version_created".to_string(),
        };
        state.idempotency.insert(
            key,
            IdempotencyEntry {
                outcome: IdempotentOutcome::Rollback(response),
                recorded_at_millis: now,
            },
        );

        Ok((version, publication, event))
    }

    async fn get_storage_health(&self) -> Result<StorageHealth> {
        let state = self.state.read().await;
        Ok(StorageHealth {
            notes: state.notes.len(),
            drafts: state.drafts.len(),
            versions: state.versions.len(),
            collections: state.collections.len(),
            publications: state.publications.len(),
            sessions: state.sessions.len(),
            snapshots: state.snapshots.len(),
            pending_visibility_events: state.outbox.len(),
        })
    }

    async fn perform_maintenance(&self, now_millis: u64, retention_ms: u64) -> Result<MaintenanceReport> {
        let mut state = self.state.write().await;
        let before = state.idempotency.len();
        state
            .idempotency
            .retain(|_, entry| now_millis.saturating_sub(entry.recorded_at_millis) <= retention_ms);
        Ok(MaintenanceReport {
            idempotency_entries_pruned: before - state.idempotency.len(),
        })
    }

    async fn drain_visibility_events(&self, max: usize) -> Result<Vec<VisibilityEvent>> {
        let mut state = self.state.write().await;
        let mut drained = Vec::with_capacity(max.min(state.outbox.len()));
        for _ in 0..max {
            match state.outbox.pop_front() {
                Some(event) => drained.push(event),
                None => break,
            }
        }
        Ok(drained)
    }

    async fn resolve_anchor_text(&self, version_id: &Id, anchor_ref: &Anchor) -> Result<Option<String>> {
        let content = {
            let state = self.state.read().await;
            state
                .versions
                .get(version_id)
                .map(|v| v.content_md.clone())
                .ok_or_else(|| ScriptoriumError::not_found("version", version_id.to_string()))?
        };
        match anchor::resolve(anchor_ref, &content) {
            anchor::ResolveOutcome::Resolved { span } | anchor::ResolveOutcome::Drifted { span: Some(span), .. } => {
                let normalized = crate::anchor::tokenizer::normalize(&content);
                let tokens = crate::anchor::tokenizer::tokenize(&normalized);
                Ok(Some(slice_for_span(&tokens, &normalized, span)))
            }
            _ => Ok(None),
        }
    }
}

fn slice_for_span(tokens: &[crate::anchor::tokenizer::Token], normalized: &str, span: anchor::AnchorSpan) -> String {
    if span.token_offset >= tokens.len() || span.token_length == 0 {
        return String::new();
    }
    let end = (span.token_offset + span.token_length).min(tokens.len());
    let start_char = tokens[span.token_offset].char_start;
    let last = &tokens[end - 1];
    let end_char = last.char_start + last.char_len;
    normalized.get(start_char..end_char).unwrap_or_default().to_string()
}
