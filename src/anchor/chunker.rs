//! Markdown-aware passage chunking.

use crate::anchor::tokenizer::{normalize, tokenize, Token};
use crate::error::{Result, ScriptoriumError};

pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 180;
pub const DEFAULT_OVERLAP_TOKENS: usize = 40;
pub const MIN_MAX_TOKENS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub max_tokens_per_chunk: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS_PER_CHUNK,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens_per_chunk < MIN_MAX_TOKENS {
            return Err(ScriptoriumError::Validation(format!(
                "max_tokens_per_chunk must be >= {MIN_MAX_TOKENS}"
            )));
        }
        if self.overlap_tokens >= self.max_tokens_per_chunk {
            return Err(ScriptoriumError::Validation(
                "overlap_tokens must be less than max_tokens_per_chunk".into(),
            ));
        }
        if self.overlap_tokens * 2 > self.max_tokens_per_chunk {
            return Err(ScriptoriumError::Validation(
                "overlap_tokens must not exceed 50% of max_tokens_per_chunk".into(),
            ));
        }
        Ok(())
    }
}

/// One produced chunk, ready to become a Passage once attached to a Version.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub structure_path: String,
    pub char_offset: usize,
    pub char_length: usize,
    pub token_offset: usize,
    pub token_length: usize,
    pub text: String,
}

struct Section {
    path: String,
    char_start: usize,
    char_end: usize,
}

/// Splits normalized markdown into heading-delimited sections, producing a
/// slash-joined `structure_path` per section.
fn split_sections(normalized: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut stack: Vec<(usize, String)> = Vec::new(); // (level, slug)
    let mut current_start = 0usize;
    let mut line_start = 0usize;

    let push_section = |sections: &mut Vec<Section>, path: String, start: usize, end: usize| {
        if end > start {
            sections.push(Section {
                path,
                char_start: start,
                char_end: end,
            });
        }
    };

    let mut current_path = String::new();

    for line in normalized.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        if let Some(level_and_title) = heading_level(trimmed) {
            let (level, title) = level_and_title;
            push_section(
                &mut sections,
                current_path.clone(),
                current_start,
                line_start,
            );
            while let Some((top_level, _)) = stack.last() {
                if *top_level >= level {
                    stack.pop();
                } else {
                    break;
                }
            }
            stack.push((level, slugify(title)));
            current_path = stack
                .iter()
                .map(|(_, slug)| slug.as_str())
                .collect::<Vec<_>>()
                .join("/");
            current_start = line_start;
        }
        line_start += line.len();
    }
    push_section(&mut sections, current_path, current_start, normalized.len());

    if sections.is_empty() {
        sections.push(Section {
            path: String::new(),
            char_start: 0,
            char_end: normalized.len(),
        });
    }
    sections
}

fn heading_level(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = trimmed[hashes..].trim_start();
    if rest.is_empty() {
        return None;
    }
    Some((hashes, rest))
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = false;
    for c in title.trim().chars() {
        if c.is_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Greedily chunks each structural section into passages of at most
/// `max_tokens_per_chunk` tokens, with consecutive passages in the same
/// section sharing `overlap_tokens` tokens.
pub fn chunk(content_md: &str, config: ChunkerConfig) -> Result<Vec<Chunk>> {
    config.validate()?;
    let normalized = normalize(content_md);
    let tokens = tokenize(&normalized);
    let sections = split_sections(&normalized);

    let mut chunks = Vec::new();

    for section in sections {
        let section_tokens: Vec<(usize, &Token)> = tokens
            .iter()
            .enumerate()
            .skip_while(|(_, t)| t.char_start < section.char_start)
            .take_while(|(_, t)| t.char_start < section.char_end)
            .collect();

        if section_tokens.is_empty() {
            continue;
        }

        let step = config.max_tokens_per_chunk - config.overlap_tokens;
        let mut local_start = 0usize;
        while local_start < section_tokens.len() {
            let local_end = (local_start + config.max_tokens_per_chunk).min(section_tokens.len());
            let slice = &section_tokens[local_start..local_end];
            let (first_idx, first_tok) = slice[0];
            let (_, last_tok) = slice[slice.len() - 1];
            let char_offset = first_tok.char_start;
            let char_end = last_tok.char_start + last_tok.char_len;
            chunks.push(Chunk {
                structure_path: section.path.clone(),
                char_offset,
                char_length: char_end.saturating_sub(char_offset),
                token_offset: first_idx,
                token_length: slice.len(),
                text: normalized[char_offset..char_end].to_string(),
            });
            if local_end == section_tokens.len() {
                break;
            }
            local_start += step;
        }
    }

    Ok(chunks)
}
