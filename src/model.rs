//! Entity types for the knowledge repository.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::Id;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_TAGS: usize = 15;
pub const MAX_TAG_LEN: usize = 40;
pub const MAX_COLLECTIONS_PER_NOTE: usize = 10;
pub const RESERVED_COLLECTION_NAMES: &[&str] = &["all"];
pub const MAX_COLLECTION_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    pub tags: Vec<String>,
    pub fields: BTreeMap<String, String>,
}

impl Metadata {
    pub fn validate(&self) -> Result<(), String> {
        if self.tags.len() > MAX_TAGS {
            return Err(format!("at most {MAX_TAGS} tags are allowed"));
        }
        for tag in &self.tags {
            if tag.is_empty() || tag.chars().count() > MAX_TAG_LEN {
                return Err(format!("tag must be 1..={MAX_TAG_LEN} characters"));
            }
        }
        Ok(())
    }
}

/// Editorial label carried by a Version: affects UX only, never immutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionLabel {
    Minor,
    Major,
}

impl Default for VersionLabel {
    fn default() -> Self {
        VersionLabel::Minor
    }
}

/// Logical document identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Id,
    pub title: String,
    pub metadata: Metadata,
    pub created_at: u64,
    pub updated_at: u64,
    pub current_version_id: Option<Id>,
}

/// Mutable working copy bound 1:1 to a Note. Never visible to search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub note_id: Id,
    pub body_md: String,
    pub metadata: Metadata,
    pub autosave_ts: u64,
}

/// Immutable content snapshot of a Note: `content_md`, `content_hash`, and
/// `parent_version_id` never change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: Id,
    pub note_id: Id,
    pub content_md: String,
    pub metadata: Metadata,
    pub content_hash: String,
    pub created_at: u64,
    pub parent_version_id: Option<Id>,
    pub label: VersionLabel,
}

/// Linkage of a Version to one or more Collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub id: Id,
    pub note_id: Id,
    pub version_id: Id,
    pub collections: Vec<Id>,
    pub published_at: u64,
    pub label: VersionLabel,
}

/// Named, workspace-unique scope. Membership with Notes is many-to-many.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub created_at: u64,
}

impl Collection {
    pub fn validate_name(name: &str) -> Result<(), String> {
        if name.is_empty() || name.chars().count() > MAX_COLLECTION_NAME_LEN {
            return Err(format!(
                "collection name must be 1..={MAX_COLLECTION_NAME_LEN} characters"
            ));
        }
        let allowed = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ' ');
        if !allowed {
            return Err("collection name has disallowed characters".into());
        }
        if RESERVED_COLLECTION_NAMES.contains(&name.to_ascii_lowercase().as_str()) {
            return Err(format!("collection name '{name}' is reserved"));
        }
        Ok(())
    }
}

/// One step in a replayable reading/query session. `ref_ids` are opaque: a
/// Session survives even if the referenced versions are later deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStep {
    pub step_index: u64,
    pub timestamp: u64,
    pub step_type: StepType,
    pub ref_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Query,
    Open,
    Cite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Id,
    pub created_at: u64,
    pub pinned: bool,
    pub steps: Vec<SessionStep>,
}

/// Point-in-time capture of the whole workspace, restorable by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Id,
    pub scope: String,
    pub description: Option<String>,
    pub created_at: u64,
    pub state: SnapshotState,
}

/// The frozen workspace payload a Snapshot carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotState {
    pub notes: Vec<Note>,
    pub drafts: Vec<Draft>,
    pub versions: Vec<Version>,
    pub collections: Vec<Collection>,
    pub publications: Vec<Publication>,
    pub memberships: Vec<(Id, Id)>, // (note_id, collection_id)
}

#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub tag: Option<String>,
    pub collection_id: Option<Id>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: Option<usize>,
    pub offset: usize,
}

pub fn validate_title(title: &str) -> Result<(), String> {
    let len = title.chars().count();
    if len < 1 || len > MAX_TITLE_LEN {
        return Err(format!("title must be 1..={MAX_TITLE_LEN} characters"));
    }
    Ok(())
}
