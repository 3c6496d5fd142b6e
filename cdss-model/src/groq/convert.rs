//! Wire types for the OpenAI-compatible chat completions API.

use serde::{Deserialize, Serialize};

use crate::llm::{CompletionRequest, ResponseFormat};

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<WireResponseFormat>,
}

#[derive(Debug, Serialize)]
pub(super) struct WireMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct WireResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    pub message: String,
}

pub(super) fn to_chat_request<'a>(
    model: &'a str,
    default_temperature: f32,
    request: &'a CompletionRequest,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: request
            .messages
            .iter()
            .map(|m| WireMessage { role: m.role.as_str(), content: &m.content })
            .collect(),
        temperature: request.temperature.unwrap_or(default_temperature),
        max_tokens: request.max_tokens,
        response_format: match request.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(WireResponseFormat { kind: "json_object" }),
        },
    }
}
