//! Relevance compression for retrieved chunks.
//!
//! A [`DocumentCompressor`] runs after similarity search and may only drop or
//! shorten candidates, never add them. [`LlmChainExtractor`] asks the chat
//! model, once per candidate, to copy out the parts relevant to the query.

use std::sync::Arc;

use async_trait::async_trait;
use cdss_model::{ChatModel, CompletionRequest, Message};
use tracing::{debug, error};

use crate::document::SearchResult;
use crate::error::Result;

/// Marker the extractor prompt asks for when nothing is relevant.
pub const NO_OUTPUT: &str = "NO_OUTPUT";

/// Filters or shortens search results given the original query.
#[async_trait]
pub trait DocumentCompressor: Send + Sync {
    /// Return the subset of `results` relevant to `query`, in the original order.
    async fn compress(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>>;
}

/// A compressor that returns results unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCompressor;

#[async_trait]
impl DocumentCompressor for NoOpCompressor {
    async fn compress(&self, _query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        Ok(results)
    }
}

/// Extracts query-relevant passages from each candidate with a chat model.
///
/// For every candidate:
/// - `NO_OUTPUT` or an empty reply drops the candidate
/// - a reply that appears verbatim in the chunk replaces the chunk content
/// - any other reply keeps the original content, so retrieved text is always
///   a substring of an indexed chunk
pub struct LlmChainExtractor {
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

impl LlmChainExtractor {
    /// Create an extractor that calls `model` at the given temperature.
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    fn prompt(query: &str, context: &str) -> String {
        format!(
            "Given the following question and context, extract any part of the context \
             *AS IS* that is relevant to answer the question. If none of the context is \
             relevant return {NO_OUTPUT}.\n\n\
             Remember, *DO NOT* edit the extracted parts of the context.\n\n\
             > Question: {query}\n\
             > Context:\n>>>\n{context}\n>>>\n\
             Extracted relevant parts:"
        )
    }
}

/// What to do with one candidate after extraction.
#[derive(Debug, PartialEq, Eq)]
enum Extraction {
    Drop,
    Replace(String),
    Keep,
}

fn interpret(original: &str, reply: &str) -> Extraction {
    let reply = reply.trim();
    if reply.is_empty() || reply == NO_OUTPUT || (reply.ends_with(NO_OUTPUT) && reply.len() < 32) {
        return Extraction::Drop;
    }
    if original.contains(reply) { Extraction::Replace(reply.to_string()) } else { Extraction::Keep }
}

#[async_trait]
impl DocumentCompressor for LlmChainExtractor {
    async fn compress(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        let candidates = results.len();
        let mut retained = Vec::with_capacity(candidates);

        for mut result in results {
            let request = CompletionRequest::new(vec![Message::user(Self::prompt(
                query,
                &result.chunk.content,
            ))])
            .with_temperature(self.temperature);

            let reply = self.model.complete(request).await.map_err(|e| {
                error!(chunk.id = %result.chunk.id, error = %e, "compression model call failed");
                e
            })?;

            match interpret(&result.chunk.content, &reply) {
                Extraction::Drop => {
                    debug!(chunk.id = %result.chunk.id, "dropped irrelevant chunk");
                }
                Extraction::Replace(extracted) => {
                    result.chunk.content = extracted;
                    retained.push(result);
                }
                Extraction::Keep => {
                    debug!(chunk.id = %result.chunk.id, "extraction not verbatim, keeping chunk");
                    retained.push(result);
                }
            }
        }

        debug!(candidates, retained = retained.len(), "compression finished");
        Ok(retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interprets_extractor_replies() {
        let original = "Stage C: structural heart disease with current or previous symptoms of HF.";
        assert_eq!(interpret(original, "NO_OUTPUT"), Extraction::Drop);
        assert_eq!(interpret(original, "  \n"), Extraction::Drop);
        assert_eq!(interpret(original, "Answer: NO_OUTPUT"), Extraction::Drop);
        assert_eq!(
            interpret(original, " Stage C: structural heart disease "),
            Extraction::Replace("Stage C: structural heart disease".into())
        );
        assert_eq!(interpret(original, "Stage C means symptomatic HF"), Extraction::Keep);
    }
}
