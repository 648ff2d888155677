//! Entity store port.
//!
//! The trait is the swappable boundary; [`memory::InMemoryStore`] is the
//! only implementation shipped here, but a relational backend could
//! implement the same contract without leaking transaction objects across
//! the boundary. Because the in-memory store lives entirely behind one
//! `tokio::sync::RwLock`, a generic transaction-closure API is realized as
//! two concrete atomic methods, [`StoragePort::commit_publish`] and
//! [`StoragePort::commit_rollback`], instead — see DESIGN.md for the
//! rationale.

pub mod idempotency;
pub mod memory;

use async_trait::async_trait;

use crate::anchor::Anchor;
use crate::error::Result;
use crate::ids::Id;
use crate::model::{
    Collection, Draft, ListOptions, Metadata, Note, NoteFilter, Publication, Session,
    SessionStep, Snapshot, Version, VersionLabel,
};
use crate::visibility::VisibilityEvent;
use idempotency::IdempotentOutcome;

#[derive(Debug, Clone, Default)]
pub struct StorageHealth {
    pub notes: usize,
    pub drafts: usize,
    pub versions: usize,
    pub collections: usize,
    pub publications: usize,
    pub sessions: usize,
    pub snapshots: usize,
    pub pending_visibility_events: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub idempotency_entries_pruned: usize,
}

/// Everything the two-phase publish transaction needs to materialize in one
/// atomic step.
pub struct PublishCommit<'a> {
    pub note_id: &'a Id,
    pub content_md: String,
    pub metadata: Metadata,
    pub collections: Vec<Id>,
    pub label: Option<VersionLabel>,
    pub client_token: String,
}

pub struct RollbackCommit<'a> {
    pub note_id: &'a Id,
    pub target_version_id: &'a Id,
    pub client_token: String,
}

#[async_trait]
pub trait StoragePort: Send + Sync {
    async fn create_note(
        &self,
        title: String,
        initial_content: String,
        metadata: Metadata,
    ) -> Result<Note>;
    async fn get_note(&self, id: &Id) -> Result<Note>;
    async fn list_notes(&self, filter: NoteFilter, options: ListOptions) -> Result<Vec<Note>>;
    async fn update_note_metadata(&self, id: &Id, metadata: Metadata) -> Result<Note>;
    async fn delete_note(&self, id: &Id) -> Result<()>;

    async fn save_draft(&self, note_id: &Id, body_md: String, metadata: Metadata) -> Result<Draft>;
    async fn get_draft(&self, note_id: &Id) -> Result<Draft>;

    async fn get_version(&self, id: &Id) -> Result<Version>;
    async fn list_versions(&self, note_id: &Id) -> Result<Vec<Version>>;
    async fn get_current_version(&self, note_id: &Id) -> Result<Version>;

    async fn create_collection(&self, name: String, description: Option<String>) -> Result<Collection>;
    async fn list_collections(&self) -> Result<Vec<Collection>>;
    async fn get_collection(&self, id: &Id) -> Result<Collection>;
    async fn get_collection_by_name(&self, name: &str) -> Result<Option<Collection>>;
    async fn update_collection(&self, id: &Id, description: Option<String>) -> Result<Collection>;
    async fn delete_collection(&self, id: &Id) -> Result<()>;
    async fn collections_for_note(&self, note_id: &Id) -> Result<Vec<Id>>;

    async fn create_session(&self) -> Result<Session>;
    async fn append_session_steps(&self, id: &Id, steps: Vec<SessionStep>) -> Result<Session>;
    async fn get_session(&self, id: &Id) -> Result<Session>;
    async fn list_sessions(&self) -> Result<Vec<Session>>;
    async fn pin_session(&self, id: &Id) -> Result<Session>;

    async fn create_snapshot(&self, scope: String, description: Option<String>) -> Result<Snapshot>;
    async fn list_snapshots(&self) -> Result<Vec<Snapshot>>;
    async fn restore_snapshot(&self, id: &Id) -> Result<()>;
    async fn delete_snapshot(&self, id: &Id) -> Result<()>;

    /// Looks up a prior idempotent response for (note_id, client_token).
    async fn lookup_idempotent(&self, note_id: &Id, client_token: &str) -> Result<Option<IdempotentOutcome>>;

    /// Atomically creates a Version, a Publication, adds memberships, deletes
    /// the Draft, stamps `Note.current_version_id`, records the idempotency
    /// mapping, and enqueues exactly one VisibilityEvent — all as one unit.
    async fn commit_publish(&self, commit: PublishCommit<'_>) -> Result<(Version, Publication, VisibilityEvent)>;

    /// Atomically creates a rollback Version (content copied from the
    /// target, `parent_version_id` set to the target) plus its Publication,
    /// matching the collections the target's most recent publication used.
    async fn commit_rollback(&self, commit: RollbackCommit<'_>) -> Result<(Version, Publication, VisibilityEvent)>;

    async fn get_storage_health(&self) -> Result<StorageHealth>;
    async fn perform_maintenance(&self, now_millis: u64, retention_ms: u64) -> Result<MaintenanceReport>;

    /// Drains visibility events enqueued since the last drain, in FIFO
    /// enqueue order — events for a given note are always processed in the
    /// order they were enqueued.
    async fn drain_visibility_events(&self, max: usize) -> Result<Vec<VisibilityEvent>>;

    /// Resolves an anchor's passage text against the version it was minted
    /// from, independent of the indexer — used to render citation snippets.
    async fn resolve_anchor_text(&self, version_id: &Id, anchor: &Anchor) -> Result<Option<String>>;
}

pub use memory::InMemoryStore;
