//! Error types for the `cdss-graph` crate.

use thiserror::Error;

use crate::node::NodeName;

/// Errors raised while running the guideline graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The classifier returned something other than `medical` or `general`.
    #[error("Unrecognized intent: {0}")]
    UnrecognizedIntent(String),

    /// A node ran before the state field it reads was populated.
    #[error("Node '{node}' requires '{field}' but it is not set")]
    MissingState {
        /// The node that failed.
        node: NodeName,
        /// The missing state field.
        field: &'static str,
    },

    /// Ingestion, indexing or retrieval failed.
    #[error(transparent)]
    Rag(#[from] cdss_rag::RagError),

    /// A chat model call failed.
    #[error(transparent)]
    Model(#[from] cdss_model::ModelError),

    /// A checkpoint could not be stored.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

/// A convenience result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
