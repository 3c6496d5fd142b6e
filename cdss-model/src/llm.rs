//! The [`ChatModel`] trait and request types.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::message::Message;

/// The output format requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form text.
    #[default]
    Text,
    /// A single JSON object (OpenAI-compatible `json_object` mode).
    JsonObject,
}

/// A chat-completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// The conversation sent to the model, in order.
    pub messages: Vec<Message>,
    /// Sampling temperature. `None` uses the client's configured default.
    pub temperature: Option<f32>,
    /// Requested output format.
    pub response_format: ResponseFormat,
    /// Optional cap on generated tokens.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a text request for the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages, ..Self::default() }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the response format.
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Cap the number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A hosted language model that turns a conversation into a text completion.
///
/// Implementations wrap a specific provider behind a unified async interface.
/// Every pipeline stage that needs a model (intent classification, retrieval
/// compression, answer generation) takes an `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model identifier, used in logs.
    fn name(&self) -> &str;

    /// Run a completion and return the text of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Run a completion in JSON mode and deserialize the result into `T`.
///
/// The model output must parse into `T`; malformed output is a
/// [`ModelError::StructuredOutput`], never coerced.
pub async fn complete_structured<T: DeserializeOwned>(
    model: &dyn ChatModel,
    request: CompletionRequest,
) -> Result<T> {
    let request = request.with_response_format(ResponseFormat::JsonObject);
    let raw = model.complete(request).await?;
    debug!(model = model.name(), output_len = raw.len(), "structured completion received");

    serde_json::from_str(strip_code_fence(&raw)).map_err(|e| {
        error!(model = model.name(), error = %e, "structured output did not parse");
        ModelError::StructuredOutput(format!("{e}: {raw}"))
    })
}

/// Strip a surrounding markdown code fence (```json ... ```) if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
