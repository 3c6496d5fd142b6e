//! Chat-completion models for the heart failure guideline CDSS.
//!
//! The pipeline treats the language model as an opaque service. This crate
//! provides the [`ChatModel`] seam every stage talks to, a structured-output
//! helper, and a [`GroqClient`](groq::GroqClient) for Groq's OpenAI-compatible
//! chat completions API.
//!
//! # Example
//!
//! ```rust,ignore
//! use cdss_model::{ChatModel, CompletionRequest, Message};
//! use cdss_model::groq::{GroqClient, GroqConfig};
//!
//! let model = GroqClient::new(GroqConfig::from_env()?)?;
//! let answer = model
//!     .complete(CompletionRequest::new(vec![Message::user("What is HFrEF?")]))
//!     .await?;
//! ```

pub mod error;
pub mod groq;
pub mod llm;
pub mod message;

pub use error::{ModelError, Result};
pub use llm::{ChatModel, CompletionRequest, ResponseFormat, complete_structured};
pub use message::{Message, Role};
