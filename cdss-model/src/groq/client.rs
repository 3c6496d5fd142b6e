//! Groq chat completions client.

use async_trait::async_trait;
use tracing::{debug, error};

use super::config::GroqConfig;
use super::convert::{ChatResponse, ErrorResponse, to_chat_request};
use crate::error::{ModelError, Result};
use crate::llm::{ChatModel, CompletionRequest};

const PROVIDER: &str = "Groq";

/// A [`ChatModel`] backed by Groq's OpenAI-compatible chat completions API.
///
/// Uses `reqwest` to call `{base_url}/chat/completions` directly.
pub struct GroqClient {
    client: reqwest::Client,
    config: GroqConfig,
}

impl GroqClient {
    /// Create a client from a validated configuration.
    pub fn new(config: GroqConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder().timeout(config.timeout).build().map_err(|e| {
            ModelError::Config(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self { client, config })
    }

    /// Return the client configuration.
    pub fn config(&self) -> &GroqConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = to_chat_request(&self.config.model, self.config.temperature, &request);
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            message_count = body.messages.len(),
            json_mode = body.response_format.is_some(),
            "chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                ModelError::Request { provider: PROVIDER.into(), message: format!("{e}") }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(ModelError::Api {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                message: detail,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            ModelError::InvalidResponse {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::InvalidResponse {
                provider: PROVIDER.into(),
                message: "response contained no message content".into(),
            })
    }
}
