//! Page chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: splits by character count with configurable overlap
//! - [`RecursiveChunker`]: splits by paragraphs, lines, sentences, then words,
//!   merging pieces back up to the chunk size with overlap
//!
//! Sizes are measured in characters, never bytes, so multi-byte text (µg, ≥,
//! accented drug names) is never cut inside a code point.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::{RagConfig, SplitterKind};
use crate::document::{Chunk, Document, META_CHUNK_INDEX, META_START_INDEX};

/// A strategy for splitting pages into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the index builder.
pub trait Chunker: Send + Sync {
    /// Split a single page into chunks.
    ///
    /// Returns an empty `Vec` if the page has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Split every page in order, concatenating the results.
    fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunk(document)).collect()
    }
}

/// Build the chunker selected by `config.splitter`.
pub fn chunker_for(config: &RagConfig) -> Arc<dyn Chunker> {
    match config.splitter {
        SplitterKind::Fixed => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)),
        SplitterKind::Recursive => {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        }
    }
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk `i` starts at character `i * (chunk_size - chunk_overlap)`. Dropping the
/// first `chunk_overlap` characters of every chunk after the first reconstructs
/// the page text exactly.
///
/// # Example
///
/// ```rust,ignore
/// use cdss_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1000, 200);
/// let chunks = chunker.split_documents(&pages);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.content;
        if text.trim().is_empty() || self.chunk_size == 0 {
            return Vec::new();
        }

        // Byte offset of every char boundary, plus the end of the string.
        let offsets: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_count = offsets.len() - 1;
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            let piece = &text[offsets[start]..offsets[end]];
            chunks.push(make_chunk(document, chunks.len(), start, piece.to_string()));
            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Pieces that fit are merged greedily up to `chunk_size`; consecutive chunks
/// share up to `chunk_overlap` characters of trailing pieces. Pieces that do
/// not fit are split again with the next separator.
///
/// # Example
///
/// ```rust,ignore
/// use cdss_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&page);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.content;
        if text.trim().is_empty() || self.chunk_size == 0 {
            return Vec::new();
        }

        let pieces = split_recursive(text, self.chunk_size, self.chunk_overlap, &SEPARATORS);

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut cursor = 0;
        for piece in pieces {
            // Pieces are trimmed substrings of the page, found in order.
            let byte_start = text[cursor..].find(&piece).map(|pos| cursor + pos).unwrap_or(cursor);
            let char_start = text[..byte_start].chars().count();
            cursor = byte_start + first_char_len(&piece);
            chunks.push(make_chunk(document, chunks.len(), char_start, piece));
        }
        chunks
    }
}

fn first_char_len(text: &str) -> usize {
    text.chars().next().map(char::len_utf8).unwrap_or(0)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` with the first separator that occurs in it, recursing into
/// pieces that are still larger than `chunk_size`.
fn split_recursive(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    let position =
        separators.iter().position(|sep| sep.is_empty() || text.contains(sep)).unwrap_or(0);
    let separator = separators.get(position).copied().unwrap_or("");
    let remaining = separators.get(position + 1..).unwrap_or(&[]);

    let splits: Vec<&str> = if separator.is_empty() {
        text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
    } else {
        split_keeping_separator(text, separator)
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();
    for split in splits {
        if char_len(split) <= chunk_size {
            fitting.push(split);
            continue;
        }
        if !fitting.is_empty() {
            chunks.extend(merge_splits(&fitting, chunk_size, chunk_overlap));
            fitting.clear();
        }
        if remaining.is_empty() {
            chunks.push(split.trim().to_string());
        } else {
            chunks.extend(split_recursive(split, chunk_size, chunk_overlap, remaining));
        }
    }
    if !fitting.is_empty() {
        chunks.extend(merge_splits(&fitting, chunk_size, chunk_overlap));
    }

    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

/// Greedily join small pieces into chunks, carrying trailing pieces of up to
/// `chunk_overlap` characters into the next chunk.
fn merge_splits(splits: &[&str], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for split in splits {
        let len = char_len(split);
        if total + len > chunk_size && !window.is_empty() {
            push_joined(&mut chunks, &window);
            while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                let Some(front) = window.pop_front() else { break };
                total -= char_len(front);
            }
        }
        window.push_back(split);
        total += len;
    }
    push_joined(&mut chunks, &window);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() && chunks.last().is_none_or(|last| last != trimmed) {
        chunks.push(trimmed.to_string());
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

fn make_chunk(document: &Document, index: usize, char_start: usize, content: String) -> Chunk {
    let mut metadata = document.metadata.clone();
    metadata.insert(META_CHUNK_INDEX.to_string(), index.to_string());
    metadata.insert(META_START_INDEX.to_string(), char_start.to_string());
    Chunk {
        id: format!("{}_{index}", document.id),
        content,
        metadata,
        document_id: document.id.clone(),
        embedding: Vec::new(),
    }
}
