//! Indexer and searchable corpus.
//!
//! Maintains a corpus keyed by version_id, derived entirely from committed
//! [`crate::visibility::VisibilityEvent`]s. Only the visibility pipeline
//! worker may mutate it.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::anchor::{chunker, chunker::ChunkerConfig, Anchor};
use crate::error::{Result, ScriptoriumError};
use crate::ids::Id;
use crate::store::StoragePort;
use crate::visibility::VisibilityEvent;

/// An indexed chunk of a Version backed by an [`Anchor`].
#[derive(Debug, Clone)]
pub struct Passage {
    pub id: Id,
    pub note_id: Id,
    pub version_id: Id,
    pub anchor: Anchor,
    pub text: String,
    pub char_offset: usize,
    pub char_length: usize,
}

#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f64,
}

#[derive(Default)]
struct CorpusState {
    /// All passages for a version, keyed by version_id. Older versions'
    /// passages remain here and are queryable by id even after a rollback,
    /// but only the note's head version is part of the searchable set.
    passages_by_version: HashMap<Id, Vec<Passage>>,
    /// The searchable head set: note_id -> current indexed version_id.
    head_version_by_note: HashMap<Id, Id>,
    /// version_id -> collections it is visible in.
    collections_by_version: HashMap<Id, Vec<Id>>,
}

/// The searchable corpus. Cheap to clone (an `Arc` around this is expected
/// at the call site, matching how the rest of the crate shares state).
pub struct Corpus {
    state: RwLock<CorpusState>,
    chunker_config: ChunkerConfig,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

impl Corpus {
    pub fn new(chunker_config: ChunkerConfig) -> Self {
        Self {
            state: RwLock::default(),
            chunker_config,
        }
    }

    /// Commits one visibility event: fetches the Version, chunks it,
    /// mints Anchors, and replaces the note's head passage set.
    pub async fn commit_version(&self, store: &dyn StoragePort, event: &VisibilityEvent) -> Result<()> {
        let version = store.get_version(&event.version_id).await?;
        let chunks = chunker::chunk(&version.content_md, self.chunker_config)
            .map_err(|e| ScriptoriumError::IndexingFailure(e.to_string()))?;

        let mut passages = Vec::with_capacity(chunks.len());
        for chunk in chunks.iter() {
            let anchor = Anchor::mint(chunk);
            passages.push(Passage {
                id: crate::ids::Id::new(crate::ids::IdKind::Passage),
                note_id: event.note_id.clone(),
                version_id: event.version_id.clone(),
                anchor,
                text: chunk.text.clone(),
                char_offset: chunk.char_offset,
                char_length: chunk.char_length,
            });
        }

        let mut state = self.state.write();
        state
            .passages_by_version
            .insert(event.version_id.clone(), passages);
        state
            .head_version_by_note
            .insert(event.note_id.clone(), event.version_id.clone());
        state
            .collections_by_version
            .insert(event.version_id.clone(), event.collections.clone());
        Ok(())
    }

    /// Returns true if any version for `note_id` has ever been committed.
    pub fn has_committed(&self, note_id: &Id) -> bool {
        self.state.read().head_version_by_note.contains_key(note_id)
    }

    pub fn total_passages(&self) -> usize {
        self.state.read().passages_by_version.values().map(|v| v.len()).sum()
    }

    /// Returns up to `top_k` scored candidates, scoped to `collections`
    /// when provided.
    pub fn retrieve_candidates(&self, query: &str, collections: Option<&[Id]>, top_k: usize) -> Vec<ScoredPassage> {
        let query_tokens = query_token_set(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let state = self.state.read();
        let mut scored: Vec<ScoredPassage> = Vec::new();

        for version_id in state.head_version_by_note.values() {
            if let Some(wanted) = collections {
                let in_scope = state
                    .collections_by_version
                    .get(version_id)
                    .map(|cols| cols.iter().any(|c| wanted.contains(c)))
                    .unwrap_or(false);
                if !in_scope {
                    continue;
                }
            }
            if let Some(passages) = state.passages_by_version.get(version_id) {
                for passage in passages {
                    let score = overlap_score(&query_tokens, &passage.text);
                    if score > 0.0 {
                        scored.push(ScoredPassage {
                            passage: passage.clone(),
                            score,
                        });
                    }
                }
            }
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.passage.version_id.cmp(&b.passage.version_id))
                .then_with(|| a.passage.id.cmp(&b.passage.id))
        });
        scored.truncate(top_k);
        scored
    }

    /// Returns the stored passage text for a given passage id within a
    /// version's passage set, used to resolve citation snippets.
    pub fn passage_text(&self, version_id: &Id, passage_id: &Id) -> Option<String> {
        let state = self.state.read();
        state
            .passages_by_version
            .get(version_id)?
            .iter()
            .find(|p| &p.id == passage_id)
            .map(|p| p.text.clone())
    }
}

fn query_token_set(query: &str) -> HashSet<String> {
    crate::anchor::tokenizer::tokenize(&crate::anchor::tokenizer::normalize(query))
        .into_iter()
        .map(|t| t.text.to_lowercase())
        .collect()
}

fn overlap_score(query_tokens: &HashSet<String>, passage_text: &str) -> f64 {
    let passage_tokens: Vec<String> =
        crate::anchor::tokenizer::tokenize(&crate::anchor::tokenizer::normalize(passage_text))
            .into_iter()
            .map(|t| t.text.to_lowercase())
            .collect();
    if passage_tokens.is_empty() {
        return 0.0;
    }
    let matches = passage_tokens
        .iter()
        .filter(|t| query_tokens.contains(t.as_str()))
        .count();
    matches as f64 / passage_tokens.len() as f64
}
