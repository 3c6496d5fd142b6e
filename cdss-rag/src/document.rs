//! Data types for guideline pages, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the source path of a page.
pub const META_SOURCE: &str = "source";
/// Metadata key holding the 0-based page number.
pub const META_PAGE: &str = "page";
/// Metadata key holding the total number of pages in the source.
pub const META_TOTAL_PAGES: &str = "total_pages";
/// Metadata key holding the chunk's position within its page.
pub const META_CHUNK_INDEX: &str = "chunk_index";
/// Metadata key holding the chunk's character offset within its page.
pub const META_START_INDEX: &str = "start_index";

/// A page-level text unit loaded from a guideline document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the page, e.g. `HF_Guideline.pdf#12`.
    pub id: String,
    /// The text content of the page.
    pub content: String,
    /// Key-value metadata (`source`, `page`, `total_pages`).
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a page with no metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: HashMap::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A bounded span of a [`Document`], the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Metadata inherited from the parent page plus `chunk_index` and `start_index`.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// The vector embedding. Empty until the index builder attaches one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Return a copy without the embedding, for handing chunks to later stages.
    pub fn without_embedding(&self) -> Self {
        Self { embedding: Vec::new(), ..self.clone() }
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
