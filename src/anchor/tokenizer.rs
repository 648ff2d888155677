//! Normalization and word-level tokenization.

use unicode_normalization::UnicodeNormalization;

/// Bumped whenever tokenization rules change; stamped onto every Anchor so
/// resolvers can tell a rule mismatch from real content drift.
pub const TOKENIZATION_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub char_start: usize,
    pub char_len: usize,
}

/// Normalizes to Unicode NFC and collapses runs of whitespace, except inside
/// fenced code blocks (` ``` `), which are preserved byte-for-byte.
pub fn normalize(input: &str) -> String {
    let nfc: String = input.nfc().collect();
    let mut out = String::with_capacity(nfc.len());
    let mut in_fence = false;
    let mut last_was_space = false;
    let mut chars = nfc.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '`' && chars.peek() == Some(&'`') {
            // Lookahead for a third backtick to detect a fence marker.
            let mut lookahead = chars.clone();
            lookahead.next();
            if lookahead.peek() == Some(&'`') {
                chars.next();
                chars.next();
                out.push('`');
                out.push('`');
                out.push('`');
                in_fence = !in_fence;
                last_was_space = false;
                continue;
            }
        }
        if in_fence {
            out.push(c);
            continue;
        }
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = c != '\n';
            if c == '\n' {
                // Preserve paragraph/heading breaks: collapse runs of
                // newlines to a single newline rather than a space.
                out.pop();
                out.push('\n');
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// Deterministic word-level tokenizer over normalized text. Inline style
/// markers (`*`, `_`, backtick for inline code) are stripped for the
/// purposes of producing retrieval tokens; heading/list/fence markers are
/// left untouched upstream by the chunker, which reads structure from the
/// un-tokenized source.
pub fn tokenize(normalized: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let chars: Vec<(usize, char)> = normalized.char_indices().collect();
    let mut i = 0;
    while i < chars.len() {
        let (start, c) = chars[i];
        if c.is_whitespace() || is_inline_style_marker(c) {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        while j < chars.len() {
            let (_, cj) = chars[j];
            if cj.is_whitespace() {
                break;
            }
            j += 1;
        }
        let end = if j < chars.len() {
            chars[j].0
        } else {
            normalized.len()
        };
        let raw = &normalized[start..end];
        let trimmed = raw.trim_matches(is_inline_style_marker);
        if !trimmed.is_empty() {
            let char_len = trimmed.chars().count();
            tokens.push(Token {
                text: trimmed.to_string(),
                char_start: start,
                char_len,
            });
        }
        i = j;
    }
    tokens
}

fn is_inline_style_marker(c: char) -> bool {
    matches!(c, '*' | '_' | '`')
}
