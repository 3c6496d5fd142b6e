//! Guideline retrieval for the heart failure CDSS.
//!
//! This crate covers everything between a guideline file on disk and the
//! excerpts handed to the answer generator:
//!
//! - [`loader`]: PDF and text loaders producing page [`Document`]s
//! - [`chunking`]: [`FixedSizeChunker`] and [`RecursiveChunker`]
//! - [`embedding`] / [`openai`]: the [`EmbeddingProvider`] seam and an
//!   OpenAI-compatible HTTP implementation
//! - [`vectorstore`] / [`inmemory`]: the [`VectorStore`] seam and a cosine
//!   scan store
//! - [`index`]: the persisted [`GuidelineIndex`] and its [`IndexBuilder`]
//! - [`compression`] / [`retriever`]: [`CompressionRetriever`], top-k search
//!   followed by [`LlmChainExtractor`] relevance compression
//!
//! # Example
//!
//! ```rust,ignore
//! use cdss_rag::{IndexBuilder, RagConfig, chunker_for, loader_for_path};
//!
//! let config = RagConfig::default();
//! let pages = loader_for_path(path).load(path).await?;
//! let chunks = chunker_for(&config).split_documents(&pages);
//! let index = IndexBuilder::new(&config, embedder).load_or_build(&chunks).await?;
//! let hits = index.search("stages of heart failure", config.top_k).await?;
//! ```

pub mod chunking;
pub mod compression;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inmemory;
pub mod loader;
pub mod openai;
pub mod retriever;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod vectorstore;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunker_for};
pub use compression::{DocumentCompressor, LlmChainExtractor, NO_OUTPUT, NoOpCompressor};
pub use config::{RagConfig, RagConfigBuilder, SplitterKind};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::{GuidelineIndex, IndexBuilder, IndexOrigin, fingerprint};
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, PdfLoader, TextLoader, loader_for_path};
pub use openai::{EmbeddingConfig, OpenAIEmbeddingProvider};
pub use retriever::CompressionRetriever;
pub use vectorstore::VectorStore;
