//! OpenAI-compatible embedding provider.
//!
//! Talks to any server exposing `POST {base_url}/embeddings` in the OpenAI
//! shape: OpenAI itself, Hugging Face text-embeddings-inference, Ollama, or a
//! local sentence-transformers server hosting `all-MiniLM-L6-v2`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::{EmbeddingProvider, normalize};
use crate::error::{RagError, Result};

/// The default embedding server, a local text-embeddings-inference instance.
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://127.0.0.1:8080/v1";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// The dimensionality of `all-MiniLM-L6-v2`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

const PROVIDER: &str = "OpenAI-compatible";

/// Connection settings for an [`OpenAIEmbeddingProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// API base URL without the `/embeddings` suffix.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Expected vector length.
    pub dimensions: usize,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl EmbeddingConfig {
    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model name and its output dimensions.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Set a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings endpoint.
///
/// Returned vectors are L2-normalised so cosine similarity reduces to a dot
/// product, and their length is checked against the configured dimensions.
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from the given settings.
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        if config.dimensions == 0 {
            return Err(RagError::ConfigError("embedding dimensions must be non-zero".into()));
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build().map_err(|e| {
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to build HTTP client: {e}"),
            }
        })?;
        Ok(Self { client, config })
    }

    /// Return the provider configuration.
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.config.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest { model: &self.config.model, input: texts.to_vec() };
        let mut request =
            self.client.post(format!("{}/embeddings", self.config.base_url)).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("request failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if embedding_response.data.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embedding_response.data.len()
                ),
            });
        }

        let mut data = embedding_response.data;
        data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        data.into_iter()
            .map(|d| {
                let mut embedding = d.embedding;
                if embedding.len() != self.config.dimensions {
                    return Err(RagError::EmbeddingError {
                        provider: PROVIDER.into(),
                        message: format!(
                            "expected {} dimensions, got {}",
                            self.config.dimensions,
                            embedding.len()
                        ),
                    });
                }
                normalize(&mut embedding);
                Ok(embedding)
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}
