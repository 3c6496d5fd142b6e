//! Configuration for guideline ingestion and retrieval.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Which chunking strategy splits guideline pages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SplitterKind {
    /// Fixed character window with overlap.
    #[default]
    Fixed,
    /// Separator hierarchy (paragraph, line, sentence, word) with overlap.
    Recursive,
}

impl fmt::Display for SplitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitterKind::Fixed => f.write_str("fixed"),
            SplitterKind::Recursive => f.write_str("recursive"),
        }
    }
}

impl FromStr for SplitterKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(SplitterKind::Fixed),
            "recursive" => Ok(SplitterKind::Recursive),
            other => Err(RagError::ConfigError(format!(
                "unknown splitter '{other}', expected 'fixed' or 'recursive'"
            ))),
        }
    }
}

/// Configuration parameters for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunking strategy.
    pub splitter: SplitterKind,
    /// Number of nearest chunks fetched before compression.
    pub top_k: usize,
    /// Name of the persisted collection.
    pub collection: String,
    /// Directory the collection is persisted in.
    pub persist_dir: PathBuf,
    /// Number of chunk texts sent per embedding request.
    pub embed_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            splitter: SplitterKind::Fixed,
            top_k: 7,
            collection: "guideline".to_string(),
            persist_dir: PathBuf::from("index_db"),
            embed_batch_size: 64,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Select the chunking strategy.
    pub fn splitter(mut self, splitter: SplitterKind) -> Self {
        self.config.splitter = splitter;
        self
    }

    /// Set the number of nearest chunks fetched before compression.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the persisted collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the persistence directory.
    pub fn persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.persist_dir = dir.into();
        self
    }

    /// Set the embedding batch size.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `embed_batch_size == 0`
    /// - the collection name is empty or contains path separators
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.embed_batch_size == 0 {
            return Err(RagError::ConfigError("embed_batch_size must be greater than zero".into()));
        }
        if config.collection.is_empty()
            || config.collection.contains(['/', '\\'])
            || config.collection.starts_with('.')
        {
            return Err(RagError::ConfigError(format!(
                "invalid collection name '{}'",
                config.collection
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 7);
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn rejects_path_like_collection_names() {
        assert!(RagConfig::builder().collection("../escape").build().is_err());
        assert!(RagConfig::builder().collection("").build().is_err());
    }

    #[test]
    fn splitter_parses_case_insensitively() {
        assert_eq!("Recursive".parse::<SplitterKind>().unwrap(), SplitterKind::Recursive);
        assert!("sentence".parse::<SplitterKind>().is_err());
    }
}
