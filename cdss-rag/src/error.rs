//! Error types for the `cdss-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in ingestion, indexing and retrieval.
#[derive(Debug, Error)]
pub enum RagError {
    /// A guideline document could not be loaded.
    #[error("Load error ({}): {message}", path.display())]
    LoadError {
        /// The path that failed to load.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// The compression stage failed.
    #[error("Compression error: {0}")]
    CompressionError(String),

    /// The persisted index could not be read or written.
    #[error("Index error: {0}")]
    IndexError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in retrieval orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// A filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error propagated from the chat model.
    #[error(transparent)]
    Model(#[from] cdss_model::ModelError),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
