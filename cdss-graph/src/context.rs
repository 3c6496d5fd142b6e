//! Process-wide guideline resources shared by every invocation.
//!
//! Each resource lives in a keyed cache whose entries initialise at most once:
//! concurrent callers for the same key await the same cell, and a failed
//! initialisation leaves the cell empty so the next request retries.
//!
//! | Cache        | Key                               |
//! |--------------|-----------------------------------|
//! | documents    | canonical guideline path          |
//! | chunks       | canonical guideline path          |
//! | indexes      | fingerprint of the chunks         |
//! | retrievers   | fingerprint of the index          |

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cdss_rag::{
    Chunk, Chunker, CompressionRetriever, Document, DocumentCompressor, EmbeddingProvider,
    GuidelineIndex, IndexBuilder, RagConfig, RagError, chunker_for, fingerprint, loader_for_path,
};
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

struct Cache<K, V> {
    name: &'static str,
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    fn new(name: &'static str) -> Self {
        Self { name, cells: Mutex::new(HashMap::new()) }
    }

    async fn get_or_try_init<F, Fut>(&self, key: &K, init: F) -> cdss_rag::Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = cdss_rag::Result<V>>,
    {
        let cell = self.cells.lock().await.entry(key.clone()).or_default().clone();
        if let Some(value) = cell.get() {
            debug!(cache = self.name, ?key, "cache hit");
            return Ok(value.clone());
        }
        debug!(cache = self.name, ?key, "cache miss");
        cell.get_or_try_init(init).await.cloned()
    }

    async fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().await;
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    async fn initialised(&self) -> usize {
        self.cells.lock().await.values().filter(|cell| cell.initialized()).count()
    }
}

/// How many entries of each cache are populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSizes {
    pub documents: usize,
    pub chunks: usize,
    pub indexes: usize,
    pub retrievers: usize,
}

/// Loaded documents, chunks, indexes and retrievers, constructed once at
/// startup and shared by `Arc` with every graph invocation.
pub struct GuidelineContext {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    compressor: Arc<dyn DocumentCompressor>,
    chunker: Arc<dyn Chunker>,
    documents: Cache<PathBuf, Arc<[Document]>>,
    chunks: Cache<PathBuf, Arc<[Chunk]>>,
    indexes: Cache<String, Arc<GuidelineIndex>>,
    retrievers: Cache<String, Arc<CompressionRetriever>>,
}

impl GuidelineContext {
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        compressor: Arc<dyn DocumentCompressor>,
    ) -> Self {
        let chunker = chunker_for(&config);
        Self {
            config,
            embedder,
            compressor,
            chunker,
            documents: Cache::new("documents"),
            chunks: Cache::new("chunks"),
            indexes: Cache::new("indexes"),
            retrievers: Cache::new("retrievers"),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The ordered pages of the guideline at `path`.
    ///
    /// # Errors
    ///
    /// A path that does not resolve, or a file that cannot be loaded, is a
    /// [`RagError::LoadError`].
    pub async fn documents(&self, path: &Path) -> cdss_rag::Result<Arc<[Document]>> {
        let key = canonical(path).await?;
        self.documents
            .get_or_try_init(&key, || async {
                let docs = loader_for_path(&key).load(&key).await?;
                info!(path = %key.display(), page_count = docs.len(), "loaded guideline");
                Ok(Arc::from(docs))
            })
            .await
    }

    /// The chunks of the guideline at `path`, split from `docs` on first use.
    pub async fn chunks(&self, path: &Path, docs: &[Document]) -> cdss_rag::Result<Arc<[Chunk]>> {
        let key = canonical(path).await?;
        self.chunks
            .get_or_try_init(&key, || async {
                let chunks = self.chunker.split_documents(docs);
                if chunks.is_empty() {
                    return Err(RagError::ChunkingError(format!(
                        "{} produced no chunks",
                        key.display()
                    )));
                }
                info!(
                    path = %key.display(),
                    page_count = docs.len(),
                    chunk_count = chunks.len(),
                    splitter = %self.config.splitter,
                    "split guideline"
                );
                Ok(Arc::from(chunks))
            })
            .await
    }

    /// The index over `chunks`, loaded from disk or built on first use.
    pub async fn index(&self, chunks: &[Chunk]) -> cdss_rag::Result<Arc<GuidelineIndex>> {
        let key = fingerprint(chunks);
        self.indexes
            .get_or_try_init(&key, || async {
                IndexBuilder::new(&self.config, self.embedder.clone()).load_or_build(chunks).await
            })
            .await
    }

    /// A previously opened index, by fingerprint.
    pub async fn index_by_fingerprint(&self, fingerprint: &str) -> Option<Arc<GuidelineIndex>> {
        self.indexes.get(&fingerprint.to_string()).await
    }

    /// The compression retriever bound to `index`.
    ///
    /// Retrievers are keyed by the index fingerprint, so a rebuilt index gets
    /// a fresh retriever.
    pub async fn retriever(
        &self,
        index: &Arc<GuidelineIndex>,
    ) -> cdss_rag::Result<Arc<CompressionRetriever>> {
        let key = index.fingerprint().to_string();
        self.retrievers
            .get_or_try_init(&key, || async {
                info!(collection = index.collection(), top_k = self.config.top_k, "created retriever");
                Ok(Arc::new(CompressionRetriever::new(
                    index.clone(),
                    self.compressor.clone(),
                    self.config.top_k,
                )))
            })
            .await
    }

    /// Load, split and index the guideline at `path` ahead of the first request.
    pub async fn warm(&self, path: &Path) -> cdss_rag::Result<Arc<GuidelineIndex>> {
        let docs = self.documents(path).await?;
        let chunks = self.chunks(path, &docs).await?;
        let index = self.index(&chunks).await?;
        self.retriever(&index).await?;
        Ok(index)
    }

    pub async fn cache_sizes(&self) -> CacheSizes {
        CacheSizes {
            documents: self.documents.initialised().await,
            chunks: self.chunks.initialised().await,
            indexes: self.indexes.initialised().await,
            retrievers: self.retrievers.initialised().await,
        }
    }
}

async fn canonical(path: &Path) -> cdss_rag::Result<PathBuf> {
    tokio::fs::canonicalize(path).await.map_err(|e| RagError::LoadError {
        path: path.to_path_buf(),
        message: format!("cannot resolve guideline path: {e}"),
    })
}
