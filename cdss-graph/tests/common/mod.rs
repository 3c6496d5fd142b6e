//! Deterministic stand-ins for the chat model and embedding service.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cdss_graph::{FALLBACK, GuidelineContext, GuidelineGraph};
use cdss_model::{ChatModel, CompletionRequest, ResponseFormat};
use cdss_rag::{DocumentCompressor, LlmChainExtractor, RagConfig, SearchResult};

pub use cdss_rag::testing::BagOfWordsEmbedder;

pub const GUIDELINE: &str = "2022 AHA/ACC/HFSA Guideline for the Management of Heart Failure\n\n\
Introduction. This guideline provides recommendations for the prevention, diagnosis and \
treatment of heart failure in adults.\x0c\
Stages of Heart Failure\n\n\
Stage A (At Risk for HF): patients with hypertension, diabetes or obesity without symptoms \
or structural heart disease.\n\n\
Stage B (Pre-HF): no symptoms but structural heart disease or elevated filling pressures.\n\n\
Stage C (Symptomatic HF): structural heart disease with current or previous symptoms of HF.\n\n\
Stage D (Advanced HF): marked HF symptoms that interfere with daily life and recurrent \
hospitalizations.\x0c\
Pharmacological Treatment for HFrEF\n\n\
In patients with HFrEF, an ARNi is recommended to reduce morbidity and mortality. Beta \
blockers, MRA and SGLT2i are also recommended.";

/// A chat model that plays all three roles from the prompt shape:
///
/// - JSON mode: classifies queries mentioning heart failure terms as medical
/// - extraction prompt: returns the first sentence mentioning a stage
/// - generation prompt: echoes the excerpts on one line, or the fallback
pub struct ScriptedModel {
    label: Option<&'static str>,
    classify_calls: AtomicUsize,
    compress_calls: AtomicUsize,
    generate_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            label: None,
            classify_calls: AtomicUsize::new(0),
            compress_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        }
    }

    /// Always answer classification with `label`.
    pub fn with_label(label: &'static str) -> Self {
        Self { label: Some(label), ..Self::new() }
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn compress_calls(&self) -> usize {
        self.compress_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let rest = text.split_once(start).map(|(_, rest)| rest).unwrap_or_default();
    rest.split_once(end).map(|(inner, _)| inner).unwrap_or(rest)
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> cdss_model::Result<String> {
        let prompt = request.messages.last().map(|m| m.content.as_str()).unwrap_or_default();

        if request.response_format == ResponseFormat::JsonObject {
            self.classify_calls.fetch_add(1, Ordering::SeqCst);
            let query = between(prompt, "User query:\n", "\u{0}").to_lowercase();
            let label = self.label.unwrap_or_else(|| {
                let medical = ["heart", "hf", "stage", "cardio"].iter().any(|t| query.contains(t));
                if medical { "medical" } else { "general" }
            });
            return Ok(format!(r#"{{"intent": "{label}"}}"#));
        }

        if prompt.contains("Extracted relevant parts:") {
            self.compress_calls.fetch_add(1, Ordering::SeqCst);
            let context = between(prompt, ">>>\n", "\n>>>").trim();
            return Ok(context
                .split(". ")
                .find(|sentence| sentence.to_lowercase().contains("stage"))
                .unwrap_or("NO_OUTPUT")
                .to_string());
        }

        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let excerpts =
            between(prompt, "=== Relevant Guideline Excerpts ===\n", "\n\n=== Response ===").trim();
        if excerpts.is_empty() {
            return Ok(FALLBACK.to_string());
        }
        let flattened = excerpts.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(format!("  Per the guideline: {flattened}\n"))
    }
}

/// Drops every candidate.
pub struct DropAll;

#[async_trait]
impl DocumentCompressor for DropAll {
    async fn compress(
        &self,
        _query: &str,
        _results: Vec<SearchResult>,
    ) -> cdss_rag::Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }
}

pub fn write_guideline(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write fixture");
    path
}

pub struct Harness {
    pub model: Arc<ScriptedModel>,
    pub embedder: Arc<BagOfWordsEmbedder>,
    pub graph: GuidelineGraph,
    pub dir: tempfile::TempDir,
}

impl Harness {
    /// A graph whose compressor is the model-backed extractor.
    pub fn new(model: ScriptedModel) -> Self {
        let model = Arc::new(model);
        let compressor = Arc::new(LlmChainExtractor::new(model.clone(), 0.3));
        Self::with_compressor(model, compressor)
    }

    pub fn with_compressor(
        model: Arc<ScriptedModel>,
        compressor: Arc<dyn DocumentCompressor>,
    ) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = RagConfig::builder()
            .chunk_size(200)
            .chunk_overlap(40)
            .persist_dir(dir.path().join("index_db"))
            .build()
            .expect("valid config");
        let embedder = Arc::new(BagOfWordsEmbedder::new(128));
        let context = Arc::new(GuidelineContext::new(config, embedder.clone(), compressor));
        let graph = GuidelineGraph::new(model.clone(), context);
        Self { model, embedder, graph, dir }
    }

    pub fn guideline(&self) -> PathBuf {
        write_guideline(self.dir.path(), "hf_guideline.txt", GUIDELINE)
    }
}
