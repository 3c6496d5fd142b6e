//! Keyed caching in the guideline context.

mod common;

use std::sync::Arc;

use cdss_graph::GuidelineContext;
use cdss_rag::{IndexOrigin, NoOpCompressor, RagConfig};
use common::{BagOfWordsEmbedder, GUIDELINE, write_guideline};

fn context(dir: &std::path::Path) -> (GuidelineContext, Arc<BagOfWordsEmbedder>) {
    let config = RagConfig::builder()
        .chunk_size(200)
        .chunk_overlap(40)
        .persist_dir(dir.join("index_db"))
        .build()
        .unwrap();
    let embedder = Arc::new(BagOfWordsEmbedder::new(64));
    (GuidelineContext::new(config, embedder.clone(), Arc::new(NoOpCompressor)), embedder)
}

#[tokio::test]
async fn same_path_reuses_documents_and_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_guideline(dir.path(), "hf.txt", GUIDELINE);
    let (context, _) = context(dir.path());

    let docs = context.documents(&path).await.unwrap();
    let again = context.documents(&dir.path().join(".").join("hf.txt")).await.unwrap();
    assert!(Arc::ptr_eq(&docs, &again));

    let chunks = context.chunks(&path, &docs).await.unwrap();
    let chunks_again = context.chunks(&path, &docs).await.unwrap();
    assert!(Arc::ptr_eq(&chunks, &chunks_again));
}

#[tokio::test]
async fn rebuilt_index_gets_a_fresh_retriever() {
    let dir = tempfile::tempdir().unwrap();
    let original = write_guideline(dir.path(), "v1.txt", GUIDELINE);
    let revised = write_guideline(
        dir.path(),
        "v2.txt",
        &format!("{GUIDELINE}\n\nSGLT2i are recommended in HFmrEF to reduce hospitalization."),
    );
    let (context, _) = context(dir.path());

    let index_v1 = context.warm(&original).await.unwrap();
    let retriever_v1 = context.retriever(&index_v1).await.unwrap();
    assert!(Arc::ptr_eq(&retriever_v1, &context.retriever(&index_v1).await.unwrap()));

    let index_v2 = context.warm(&revised).await.unwrap();
    assert_eq!(index_v2.origin(), IndexOrigin::Built);
    assert_ne!(index_v1.fingerprint(), index_v2.fingerprint());

    let retriever_v2 = context.retriever(&index_v2).await.unwrap();
    assert!(!Arc::ptr_eq(&retriever_v1, &retriever_v2));
    assert_eq!(retriever_v2.index().fingerprint(), index_v2.fingerprint());
}

#[tokio::test]
async fn restarted_context_loads_the_persisted_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_guideline(dir.path(), "hf.txt", GUIDELINE);

    let (first, first_embedder) = context(dir.path());
    let built = first.warm(&path).await.unwrap();
    assert_eq!(built.origin(), IndexOrigin::Built);
    assert_eq!(first_embedder.embedded(), built.chunk_count());

    let (second, second_embedder) = context(dir.path());
    let loaded = second.warm(&path).await.unwrap();
    assert_eq!(loaded.origin(), IndexOrigin::Loaded);
    assert_eq!(loaded.fingerprint(), built.fingerprint());
    assert_eq!(second_embedder.embedded(), 0);
}

#[tokio::test]
async fn failed_loads_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_guideline(dir.path(), "late.txt", "  \n ");
    let (context, _) = context(dir.path());

    assert!(context.documents(&path).await.is_err());
    assert_eq!(context.cache_sizes().await.documents, 0);
    write_guideline(dir.path(), "late.txt", GUIDELINE);
    assert_eq!(context.documents(&path).await.unwrap().len(), 3);
}
