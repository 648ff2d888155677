//! Anchor minting and resolution against versioned content.

pub mod chunker;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::anchor::tokenizer::TOKENIZATION_VERSION;
use chunker::Chunk;
use tokenizer::{normalize, tokenize};

pub const FINGERPRINT_ALGO: &str = "sha256";

/// Re-locatable pointer into versioned content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub structure_path: String,
    pub token_offset: usize,
    pub token_length: usize,
    pub fingerprint: String,
    pub tokenization_version: u32,
    pub fingerprint_algo: String,
}

impl Anchor {
    /// Mints an anchor for the given chunk, fingerprinting the canonical
    /// token slice `[offset, offset+length)`.
    pub fn mint(chunk: &Chunk) -> Self {
        let fingerprint = fingerprint_text(&chunk.text);
        Anchor {
            structure_path: chunk.structure_path.clone(),
            token_offset: chunk.token_offset,
            token_length: chunk.token_length,
            fingerprint,
            tokenization_version: TOKENIZATION_VERSION,
            fingerprint_algo: FINGERPRINT_ALGO.to_string(),
        }
    }
}

fn fingerprint_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Outcome of attempting to re-locate an Anchor in current content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved { span: AnchorSpan },
    Drifted { classification: DriftKind, span: Option<AnchorSpan> },
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorSpan {
    pub token_offset: usize,
    pub token_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    RenamedSection,
    ContentEdited,
    Removed,
}

/// Window (in tokens) scanned around the recorded offset when the exact
/// position no longer matches.
pub const DRIFT_SCAN_WINDOW: usize = 40;

/// Resolves an anchor against the current content of a (possibly edited)
/// version.
pub fn resolve(anchor: &Anchor, current_content_md: &str) -> ResolveOutcome {
    let normalized = normalize(current_content_md);
    let tokens = tokenize(&normalized);
    let chunks = match chunker::chunk(&normalized, chunker::ChunkerConfig::default()) {
        Ok(c) => c,
        Err(_) => return ResolveOutcome::Unresolved,
    };

    // (a) exact structure_path + fingerprint match.
    for chunk in &chunks {
        if chunk.structure_path == anchor.structure_path {
            let text = slice_text(&tokens, &normalized, chunk.token_offset, chunk.token_length);
            if fingerprint_text(&text) == anchor.fingerprint {
                return ResolveOutcome::Resolved {
                    span: AnchorSpan {
                        token_offset: chunk.token_offset,
                        token_length: chunk.token_length,
                    },
                };
            }
        }
    }

    // (b) scan +/- window around the recorded offset, any structure_path.
    let lower = anchor.token_offset.saturating_sub(DRIFT_SCAN_WINDOW);
    let upper = anchor.token_offset + DRIFT_SCAN_WINDOW;
    for chunk in &chunks {
        if chunk.token_offset < lower || chunk.token_offset > upper {
            continue;
        }
        let text = slice_text(&tokens, &normalized, chunk.token_offset, anchor.token_length.min(chunk.token_length.max(1)));
        if fingerprint_text(&text) == anchor.fingerprint {
            let classification = if chunk.structure_path != anchor.structure_path {
                DriftKind::RenamedSection
            } else {
                DriftKind::ContentEdited
            };
            return ResolveOutcome::Drifted {
                classification,
                span: Some(AnchorSpan {
                    token_offset: chunk.token_offset,
                    token_length: chunk.token_length,
                }),
            };
        }
    }

    // Structure path still exists but content changed underneath it: report
    // content_edited without a resolvable span rather than claiming removal.
    if chunks.iter().any(|c| c.structure_path == anchor.structure_path) {
        return ResolveOutcome::Drifted {
            classification: DriftKind::ContentEdited,
            span: None,
        };
    }

    if tokens.is_empty() {
        return ResolveOutcome::Drifted {
            classification: DriftKind::Removed,
            span: None,
        };
    }

    ResolveOutcome::Unresolved
}

fn slice_text(tokens: &[tokenizer::Token], normalized: &str, offset: usize, length: usize) -> String {
    if offset >= tokens.len() || length == 0 {
        return String::new();
    }
    let end = (offset + length).min(tokens.len());
    let start_char = tokens[offset].char_start;
    let last = &tokens[end - 1];
    let end_char = last.char_start + last.char_len;
    normalized
        .get(start_char..end_char)
        .unwrap_or_default()
        .to_string()
}
