//! Groq provider implementation.
//!
//! Groq serves open-weight models (Llama 3.1 and friends) behind an
//! OpenAI-compatible chat completions API. The client in this module also
//! works against any other OpenAI-compatible server by overriding the base URL.
//!
//! # Example
//!
//! ```rust,ignore
//! use cdss_model::groq::{GroqClient, GroqConfig};
//!
//! let client = GroqClient::new(
//!     GroqConfig::new(std::env::var("GROQ_API_KEY")?, "llama-3.1-8b-instant")
//!         .with_temperature(0.3),
//! )?;
//! ```

mod client;
mod config;
mod convert;

pub use client::GroqClient;
pub use config::{DEFAULT_MODEL, DEFAULT_TEMPERATURE, GROQ_API_BASE, GroqConfig};
