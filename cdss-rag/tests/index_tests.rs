//! Persisted index and compression retriever behaviour.

use std::sync::Arc;

use async_trait::async_trait;
use cdss_model::{ChatModel, CompletionRequest};
use cdss_rag::{
    Chunker, CompressionRetriever, Document, FixedSizeChunker, IndexBuilder, IndexOrigin,
    LlmChainExtractor, NoOpCompressor, RagConfig,
};
use cdss_rag::testing::BagOfWordsEmbedder;

fn guideline_pages() -> Vec<Document> {
    vec![
        Document::new(
            "hf.txt#0",
            "Stages of Heart Failure. Stage A: at risk for HF. Stage B: pre-HF with structural \
             heart disease. Stage C: symptomatic HF. Stage D: advanced HF.",
        ),
        Document::new(
            "hf.txt#1",
            "Pharmacological treatment for HFrEF includes ARNi, beta blockers, MRA and SGLT2i.",
        ),
        Document::new("hf.txt#2", "Cardiac rehabilitation improves functional capacity."),
    ]
}

fn config(dir: &std::path::Path) -> RagConfig {
    RagConfig::builder().chunk_size(60).chunk_overlap(10).top_k(3).persist_dir(dir).build().unwrap()
}

#[tokio::test]
async fn second_build_loads_from_disk_without_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let chunks = FixedSizeChunker::new(60, 10).split_documents(&guideline_pages());

    let first_embedder = Arc::new(BagOfWordsEmbedder::new(64));
    let first = IndexBuilder::new(&config, first_embedder.clone()).load_or_build(&chunks).await.unwrap();
    assert_eq!(first.origin(), IndexOrigin::Built);
    assert_eq!(first_embedder.embedded(), chunks.len());
    assert!(dir.path().join("guideline.json").exists());

    let second_embedder = Arc::new(BagOfWordsEmbedder::new(64));
    let second =
        IndexBuilder::new(&config, second_embedder.clone()).load_or_build(&chunks).await.unwrap();
    assert_eq!(second.origin(), IndexOrigin::Loaded);
    assert_eq!(second_embedder.embedded(), 0);
    assert_eq!(second.fingerprint(), first.fingerprint());
    assert_eq!(second.chunk_count(), first.chunk_count());

    let a = first.search("Stage C symptomatic", 2).await.unwrap();
    let b = second.search("Stage C symptomatic", 2).await.unwrap();
    let ids_a: Vec<&str> = a.iter().map(|r| r.chunk.id.as_str()).collect();
    let ids_b: Vec<&str> = b.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids_a, ids_b);
}

#[tokio::test]
async fn changed_chunks_trigger_a_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let chunker = FixedSizeChunker::new(60, 10);
    let embedder = Arc::new(BagOfWordsEmbedder::new(64));
    let builder = IndexBuilder::new(&config, embedder.clone());

    let original = builder.load_or_build(&chunker.split_documents(&guideline_pages())).await.unwrap();

    let mut pages = guideline_pages();
    pages[2].content.push_str(" Exercise training is recommended.");
    let updated = builder.load_or_build(&chunker.split_documents(&pages)).await.unwrap();

    assert_eq!(updated.origin(), IndexOrigin::Built);
    assert_ne!(updated.fingerprint(), original.fingerprint());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_builds_of_different_guidelines_share_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let chunker = FixedSizeChunker::new(60, 10);
    let chunks_a = chunker.split_documents(&guideline_pages());
    let mut pages = guideline_pages();
    pages[1].content = "Loop diuretics relieve congestion in patients with fluid retention.".into();
    let chunks_b = chunker.split_documents(&pages);

    for _ in 0..25 {
        let builder_a = IndexBuilder::new(&config, Arc::new(BagOfWordsEmbedder::new(64)));
        let builder_b = IndexBuilder::new(&config, Arc::new(BagOfWordsEmbedder::new(64)));
        let (a, b) =
            tokio::join!(builder_a.load_or_build(&chunks_a), builder_b.load_or_build(&chunks_b));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.fingerprint(), cdss_rag::fingerprint(&chunks_a));
        assert_eq!(b.fingerprint(), cdss_rag::fingerprint(&chunks_b));
    }

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");

    // The persisted file is one whole collection, whichever write landed last.
    let persisted: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("guideline.json")).unwrap()).unwrap();
    let (expected, count) = if persisted["fingerprint"] == cdss_rag::fingerprint(&chunks_a) {
        (cdss_rag::fingerprint(&chunks_a), chunks_a.len())
    } else {
        (cdss_rag::fingerprint(&chunks_b), chunks_b.len())
    };
    assert_eq!(persisted["fingerprint"], expected);
    assert_eq!(persisted["chunks"].as_array().unwrap().len(), count);
}

#[tokio::test]
async fn empty_chunks_without_persisted_index_fail() {
    let dir = tempfile::tempdir().unwrap();
    let err = IndexBuilder::new(&config(dir.path()), Arc::new(BagOfWordsEmbedder::new(8)))
        .load_or_build(&[])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no chunks"));
}

/// Keeps only excerpts mentioning "stage", echoing that sentence verbatim.
struct StageExtractor;

#[async_trait]
impl ChatModel for StageExtractor {
    fn name(&self) -> &str {
        "stage-extractor"
    }

    async fn complete(&self, request: CompletionRequest) -> cdss_model::Result<String> {
        let prompt = &request.messages[0].content;
        let context = prompt.split(">>>\n").nth(1).unwrap_or_default().trim();
        Ok(context
            .split(". ")
            .find(|sentence| sentence.to_lowercase().contains("stage"))
            .unwrap_or("NO_OUTPUT")
            .to_string())
    }
}

#[tokio::test]
async fn retriever_bounds_results_and_keeps_substrings() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let chunks = FixedSizeChunker::new(60, 10).split_documents(&guideline_pages());
    let index = IndexBuilder::new(&config, Arc::new(BagOfWordsEmbedder::new(64)))
        .load_or_build(&chunks)
        .await
        .unwrap();

    let plain = CompressionRetriever::new(index.clone(), Arc::new(NoOpCompressor), config.top_k);
    let uncompressed = plain.retrieve("What are the stages of heart failure?").await.unwrap();
    assert_eq!(uncompressed.len(), config.top_k);

    let compressing = CompressionRetriever::new(
        index,
        Arc::new(LlmChainExtractor::new(Arc::new(StageExtractor), 0.3)),
        config.top_k,
    );
    let retrieved = compressing.retrieve("What are the stages of heart failure?").await.unwrap();

    assert!(!retrieved.is_empty());
    assert!(retrieved.len() <= uncompressed.len());
    for chunk in &retrieved {
        assert!(chunk.embedding.is_empty());
        assert!(
            chunks.iter().any(|c| c.content.contains(&chunk.content)),
            "not a substring of any chunk: {}",
            chunk.content
        );
        assert!(chunk.content.to_lowercase().contains("stage"));
    }
}
