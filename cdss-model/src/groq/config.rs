//! Groq client configuration.

use std::time::Duration;

use crate::error::{ModelError, Result};

/// Groq's OpenAI-compatible API base.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// The default chat model.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// The default sampling temperature used by every pipeline stage.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a [`GroqClient`](super::GroqClient).
#[derive(Debug, Clone, PartialEq)]
pub struct GroqConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// API base URL without the `/chat/completions` suffix.
    pub base_url: String,
    /// Temperature used when a request does not set one.
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GroqConfig {
    /// Create a config for the given key and model with default settings.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GROQ_API_BASE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a config from `GROQ_API_KEY`, and optionally `GROQ_MODEL` and
    /// `GROQ_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| ModelError::Config("GROQ_API_KEY environment variable not set".into()))?;
        let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let mut config = Self::new(api_key, model);
        if let Ok(base_url) = std::env::var("GROQ_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    /// Point the client at a different OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ModelError::Config("API key must not be empty".into()));
        }
        if self.model.is_empty() {
            return Err(ModelError::Config("model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ModelError::Config(format!(
                "temperature ({}) must be within 0.0..=2.0",
                self.temperature
            )));
        }
        Ok(())
    }
}
