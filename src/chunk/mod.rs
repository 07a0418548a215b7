//! Text chunking with boundary awareness
//!
//! This module handles splitting document text into chunks while:
//! - Preferring paragraph, then sentence, then word boundaries
//! - Sharing a bounded overlap between consecutive chunks
//! - Hard-cutting (and flagging) text with no usable boundary
//! - Providing stable, deterministic chunk boundaries and ids

mod boundaries;

pub use boundaries::*;

use crate::error::{Error, Result};
use blake3::Hasher;
use serde::{Deserialize, Serialize};

/// A text chunk with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable id: document id prefix plus ordinal
    pub id: String,

    /// Id of the document this chunk was cut from
    pub document_id: String,

    /// Chunk index (0-based)
    pub ordinal: usize,

    /// The actual text content
    pub text: String,

    /// Byte start position in the document text
    pub char_start: usize,

    /// Byte end position in the document text (exclusive)
    pub char_end: usize,

    /// Set when the chunk had to be cut mid-sentence
    pub truncated: bool,
}

impl Chunk {
    /// Build the stable id for the chunk at `ordinal` of `document_id`
    pub fn make_id(document_id: &str, ordinal: usize) -> String {
        let prefix: String = document_id.chars().take(12).collect();
        format!("{}-{:05}", prefix, ordinal)
    }

    /// Length of the chunk text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Split `text` into overlapping chunks of at most `max_chars` bytes.
///
/// Returns an empty vector for blank text. Consecutive chunks share at most
/// `overlap` bytes; the shared span always starts at a word boundary.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    max_chars: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    if max_chars == 0 || overlap >= max_chars {
        return Err(Error::Config(format!(
            "chunk size {} must be greater than overlap {}",
            max_chars, overlap
        )));
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let break_points = find_break_points(text);

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current_start = skip_whitespace(text, 0);

    while current_start < text.len() {
        let target_end = current_start + max_chars;

        let (chunk_end, truncated) = if target_end >= text.len() {
            (text.len(), false)
        } else {
            find_chunk_end(text, current_start, target_end, overlap, max_chars, &break_points)
        };

        if let Some((start, end)) = trimmed_span(text, current_start, chunk_end) {
            let ordinal = chunks.len();
            chunks.push(Chunk {
                id: Chunk::make_id(document_id, ordinal),
                document_id: document_id.to_string(),
                ordinal,
                text: text[start..end].to_string(),
                char_start: start,
                char_end: end,
                truncated,
            });
        }

        if chunk_end >= text.len() {
            break;
        }

        // Move to next chunk with overlap
        let next_start = overlap_start(text, chunk_end.saturating_sub(overlap), chunk_end);
        current_start = if next_start > current_start {
            next_start
        } else {
            chunk_end
        };
        current_start = skip_whitespace(text, current_start);
    }

    Ok(chunks)
}

/// Decide where the chunk starting at `start` ends, and whether that cut is mid-sentence
fn find_chunk_end(
    text: &str,
    start: usize,
    target_end: usize,
    overlap: usize,
    max_chars: usize,
    break_points: &[BreakPoint],
) -> (usize, bool) {
    // Prefer a break in the back half of the window so chunks don't come out tiny
    let floor = start + overlap;
    let preferred_floor = floor.max(start + max_chars / 2);

    let best = best_break_in(break_points, preferred_floor, target_end)
        .or_else(|| best_break_in(break_points, floor, target_end));

    match best {
        Some(point) => (point.position, !point.ends_sentence()),
        None => {
            let cut = ensure_char_boundary(text, target_end);
            let cut = if cut <= start {
                next_char_boundary(text, start)
            } else {
                cut
            };
            (cut, true)
        }
    }
}

/// First word start in `[from, limit)`, or `limit` when there is none
fn overlap_start(text: &str, from: usize, limit: usize) -> usize {
    let mut pos = from;
    while pos < limit && !text.is_char_boundary(pos) {
        pos += 1;
    }

    while pos < limit {
        let at_word_start = match text[..pos].chars().next_back() {
            None => true,
            Some(prev) => prev.is_whitespace(),
        };
        let starts_word = text[pos..]
            .chars()
            .next()
            .is_some_and(|c| !c.is_whitespace());

        if at_word_start && starts_word {
            return pos;
        }
        pos = next_char_boundary(text, pos);
    }

    limit
}

/// Trim whitespace from both ends of `text[start..end]`, returning the new span
fn trimmed_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading + trailing >= slice.len() {
        return None;
    }
    Some((start + leading, end - trailing))
}

fn skip_whitespace(text: &str, pos: usize) -> usize {
    let rest = &text[pos..];
    pos + (rest.len() - rest.trim_start().len())
}

/// Ensure a position is on a valid UTF-8 character boundary
fn ensure_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut adjusted = pos;
    while adjusted > 0 && !text.is_char_boundary(adjusted) {
        adjusted -= 1;
    }
    adjusted
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map(|c| pos + c.len_utf8())
        .unwrap_or(text.len())
}

/// Compute a stable hash for document content
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().to_hex().to_string()
}

/// Compute a stable hash for a string
pub fn compute_text_hash(text: &str) -> String {
    compute_content_hash(text.as_bytes())
}
