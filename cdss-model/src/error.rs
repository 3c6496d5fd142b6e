//! Error types for the `cdss-model` crate.

use thiserror::Error;

/// Errors that can occur when calling a chat-completion model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The HTTP request could not be sent or timed out.
    #[error("Request error ({provider}): {message}")]
    Request {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("API error ({provider}, {status}): {message}")]
    Api {
        /// The model provider that produced the error.
        provider: String,
        /// The HTTP status code returned.
        status: u16,
        /// The error detail reported by the provider.
        message: String,
    },

    /// The provider response did not have the expected shape.
    #[error("Invalid response ({provider}): {message}")]
    InvalidResponse {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Structured output could not be parsed into the requested type.
    #[error("Structured output error: {0}")]
    StructuredOutput(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
