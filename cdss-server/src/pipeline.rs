//! Wiring of model, embedder, compressor and context from [`Settings`].

use std::sync::Arc;

use anyhow::Context;
use cdss_graph::{GuidelineContext, GuidelineGraph, InMemoryCheckpointer};
use cdss_model::ChatModel;
use cdss_model::groq::GroqClient;
use cdss_rag::{DocumentCompressor, LlmChainExtractor, OpenAIEmbeddingProvider};
use tracing::info;

use crate::config::Settings;

/// A context for indexing and retrieval with the given compressor.
pub fn build_context(
    settings: &Settings,
    compressor: Arc<dyn DocumentCompressor>,
) -> anyhow::Result<GuidelineContext> {
    let rag = settings.rag_config()?;
    let embedder = OpenAIEmbeddingProvider::new(settings.embedding_config())
        .context("failed to create embedding client")?;
    Ok(GuidelineContext::new(rag, Arc::new(embedder), compressor))
}

/// The full graph: Groq for classification, compression and generation.
pub fn build_graph(settings: &Settings) -> anyhow::Result<GuidelineGraph> {
    let groq = GroqClient::new(settings.groq_config()?).context("failed to create Groq client")?;
    let model: Arc<dyn ChatModel> = Arc::new(groq);
    let compressor = Arc::new(LlmChainExtractor::new(model.clone(), settings.temperature));
    let context = Arc::new(build_context(settings, compressor)?);

    info!(
        model = model.name(),
        embedding_model = %settings.embedding_model,
        guideline = %settings.guideline_path.display(),
        max_threads = settings.max_threads,
        "guideline graph ready"
    );
    let checkpointer = InMemoryCheckpointer::default().with_max_threads(settings.max_threads);
    Ok(GuidelineGraph::with_temperature(model, context, settings.temperature)
        .with_checkpointer(Arc::new(checkpointer)))
}
