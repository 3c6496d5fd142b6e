//! Grounded answer synthesis from retrieved guideline excerpts.

use std::sync::Arc;

use cdss_model::{ChatModel, CompletionRequest, Message};
use cdss_rag::Chunk;
use tracing::{debug, error};

use crate::error::Result;

/// The sentence the model is told to use when the excerpts do not cover the query.
pub const FALLBACK: &str = "This information is out of scope of the 2022 AHA/ACC/HFSA Guideline \
for the Management of Heart Failure.";

/// Writes a short evidence-based answer from the retrieved excerpts.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    /// Answer `query` from `excerpts`, returning the trimmed model text.
    ///
    /// An empty excerpt list is not an error; the prompt instructs the model
    /// to reply with [`FALLBACK`].
    pub async fn generate(&self, query: &str, excerpts: &[Chunk]) -> Result<String> {
        let context =
            excerpts.iter().map(|chunk| chunk.content.as_str()).collect::<Vec<_>>().join("\n\n");
        debug!(excerpt_count = excerpts.len(), context_len = context.len(), "generating answer");

        let request = CompletionRequest::new(prompt_messages(query, &context))
            .with_temperature(self.temperature);
        let answer = self.model.complete(request).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "answer generation failed");
            e
        })?;
        Ok(answer.trim().to_string())
    }
}

fn prompt_messages(query: &str, context: &str) -> Vec<Message> {
    let system = format!(
        "You are a Clinical Decision Support Assistant trained on the 2022 AHA/ACC/HFSA Guideline \
         for the Management of Heart Failure.\n\n\
         - Respond ONLY using the content retrieved from the guidelines.\n\
         - If the information is not available in the excerpts, respond with: {FALLBACK}\n\
         - Keep the response concise and clinically relevant."
    );
    let human = format!(
        "=== Physician Query ===\n{query}\n\n\
         === Relevant Guideline Excerpts ===\n{context}\n\n\
         === Response ===\n\
         Provide a short, evidence-based summary to help the physician."
    );
    vec![Message::system(system), Message::user(human)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_has_system_rules_and_sections() {
        let messages = prompt_messages("What is Stage C?", "Stage C: symptomatic HF.");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains(FALLBACK));
        assert!(messages[1].content.starts_with("=== Physician Query ===\nWhat is Stage C?"));
        assert!(messages[1].content.contains("Excerpts ===\nStage C: symptomatic HF.\n\n=== Response"));
    }
}
