//! Query intent classification.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use cdss_model::{ChatModel, CompletionRequest, Message, ModelError, complete_structured};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{GraphError, Result};

/// Whether a query is about heart failure care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Medical,
    General,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Medical => "medical",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "medical" => Ok(Self::Medical),
            "general" => Ok(Self::General),
            _ => Err(GraphError::UnrecognizedIntent(s.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct IntentLabel {
    intent: String,
}

/// Classifies a query as [`Intent::Medical`] or [`Intent::General`] with one
/// JSON-mode model call.
pub struct IntentClassifier {
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    /// Classify `query`.
    ///
    /// # Errors
    ///
    /// Output that is not `{"intent": "medical" | "general"}` is
    /// [`GraphError::UnrecognizedIntent`]. Transport and API errors propagate
    /// as [`GraphError::Model`].
    pub async fn classify(&self, query: &str) -> Result<Intent> {
        let request = CompletionRequest::new(vec![Message::user(classifier_prompt(query))])
            .with_temperature(self.temperature);

        let label: IntentLabel =
            complete_structured(self.model.as_ref(), request).await.map_err(|e| match e {
                ModelError::StructuredOutput(raw) => GraphError::UnrecognizedIntent(raw),
                other => {
                    error!(model = self.model.name(), error = %other, "intent classification failed");
                    GraphError::Model(other)
                }
            })?;

        let intent = label.intent.parse()?;
        info!(%intent, "classified query");
        Ok(intent)
    }
}

fn classifier_prompt(query: &str) -> String {
    format!(
        "You are an intent classification assistant.\n\
         Your job is to read the user's query and classify it into EXACTLY one category:\n\
         - \"medical\" -- if it is related to heart failure management, cardiology, or relevant guidelines.\n\
         - \"general\" -- if it is casual talk, unrelated, or about other topics.\n\n\
         Do NOT answer the question. Respond only with a JSON object of the form \
         {{\"intent\": \"medical\"}} or {{\"intent\": \"general\"}}.\n\n\
         User query:\n{query}"
    )
}
