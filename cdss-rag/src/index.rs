//! Persisted embedding index over guideline chunks.
//!
//! [`IndexBuilder::load_or_build`] reuses `<persist_dir>/<collection>.json`
//! when it exists, is non-empty, and was built from the same chunks; otherwise
//! it embeds every chunk and writes the collection back atomically. The result
//! is a [`GuidelineIndex`] handle that embeds queries and runs similarity
//! search.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;
use crate::vectorstore::VectorStore;

const FORMAT_VERSION: u32 = 1;

/// SHA-256 over the ordered chunk contents, hex encoded.
///
/// Two chunk sequences with the same fingerprint embed to the same index.
pub fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.content.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// How a [`GuidelineIndex`] came into being.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexOrigin {
    /// Chunks were embedded in this process.
    Built,
    /// The collection was read back from disk.
    Loaded,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCollection {
    version: u32,
    collection: String,
    fingerprint: String,
    dimensions: usize,
    chunks: Vec<Chunk>,
}

/// A similarity-searchable handle over an embedded chunk collection.
pub struct GuidelineIndex {
    collection: String,
    fingerprint: String,
    dimensions: usize,
    chunk_count: usize,
    origin: IndexOrigin,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for GuidelineIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidelineIndex")
            .field("collection", &self.collection)
            .field("fingerprint", &self.fingerprint)
            .field("dimensions", &self.dimensions)
            .field("chunk_count", &self.chunk_count)
            .field("origin", &self.origin)
            .finish()
    }
}

impl GuidelineIndex {
    /// The collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The fingerprint of the chunks this index was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Embedding dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Whether the index was built or loaded.
    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }

    /// Embed `query` and return the `top_k` nearest chunks, most similar first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::PipelineError(format!("query embedding failed: {e}"))
        })?;

        self.store.search(&self.collection, &query_embedding, top_k).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "vector store search failed");
            RagError::PipelineError(format!(
                "search failed in collection '{}': {e}",
                self.collection
            ))
        })
    }
}

/// Loads a persisted index or embeds chunks into a new one.
pub struct IndexBuilder {
    collection: String,
    persist_dir: PathBuf,
    batch_size: usize,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexBuilder {
    /// Create a builder for the collection and directory named in `config`.
    pub fn new(config: &RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            collection: config.collection.clone(),
            persist_dir: config.persist_dir.clone(),
            batch_size: config.embed_batch_size.max(1),
            embedder,
        }
    }

    /// Where the collection is persisted.
    pub fn index_path(&self) -> PathBuf {
        self.persist_dir.join(format!("{}.json", self.collection))
    }

    /// Return an index for `chunks`, loading it from disk when a matching
    /// non-empty collection is persisted and embedding otherwise.
    ///
    /// # Errors
    ///
    /// Embedding-service and disk I/O errors propagate.
    pub async fn load_or_build(&self, chunks: &[Chunk]) -> Result<Arc<GuidelineIndex>> {
        let fingerprint = fingerprint(chunks);

        if let Some(persisted) = self.load_persisted(&fingerprint).await? {
            let index = self.open_index(persisted, IndexOrigin::Loaded).await?;
            info!(
                collection = %index.collection,
                chunk_count = index.chunk_count,
                "loaded existing index"
            );
            return Ok(index);
        }

        if chunks.is_empty() {
            return Err(RagError::IndexError(format!(
                "no persisted index at {} and no chunks to build one from",
                self.index_path().display()
            )));
        }

        let persisted = self.embed_chunks(chunks, fingerprint).await?;
        self.persist(&persisted).await?;
        let index = self.open_index(persisted, IndexOrigin::Built).await?;
        info!(collection = %index.collection, chunk_count = index.chunk_count, "created new index");
        Ok(index)
    }

    async fn load_persisted(&self, fingerprint: &str) -> Result<Option<PersistedCollection>> {
        let path = self.index_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persisted index");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let persisted: PersistedCollection = match serde_json::from_slice(&bytes) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "persisted index unreadable, rebuilding");
                return Ok(None);
            }
        };

        if persisted.version != FORMAT_VERSION
            || persisted.chunks.is_empty()
            || persisted.dimensions != self.embedder.dimensions()
        {
            warn!(path = %path.display(), "persisted index incompatible or empty, rebuilding");
            return Ok(None);
        }
        if persisted.fingerprint != fingerprint {
            warn!(
                path = %path.display(),
                persisted = %persisted.fingerprint,
                current = %fingerprint,
                "guideline chunks changed since the index was built, rebuilding"
            );
            return Ok(None);
        }
        Ok(Some(persisted))
    }

    async fn embed_chunks(&self, chunks: &[Chunk], fingerprint: String) -> Result<PersistedCollection> {
        let dimensions = self.embedder.dimensions();
        let mut embedded = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
                error!(collection = %self.collection, error = %e, "embedding failed during indexing");
                e
            })?;
            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: "index".into(),
                    message: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embeddings.len()
                    ),
                });
            }
            for (chunk, embedding) in batch.iter().zip(embeddings) {
                embedded.push(Chunk { embedding, ..chunk.clone() });
            }
            debug!(embedded = embedded.len(), total = chunks.len(), "embedded chunk batch");
        }

        Ok(PersistedCollection {
            version: FORMAT_VERSION,
            collection: self.collection.clone(),
            fingerprint,
            dimensions,
            chunks: embedded,
        })
    }

    /// Write the collection through a temp file unique to this write, so
    /// concurrent builds in one directory never share a partial file. The
    /// last rename wins and the final file is always one whole collection.
    async fn persist(&self, persisted: &PersistedCollection) -> Result<()> {
        tokio::fs::create_dir_all(&self.persist_dir).await?;
        let path = self.index_path();
        let tmp = self.persist_dir.join(format!(
            "{}.{}.{}.json.tmp",
            self.collection,
            &persisted.fingerprint[..persisted.fingerprint.len().min(16)],
            Uuid::new_v4().simple()
        ));
        let bytes = serde_json::to_vec(persisted)
            .map_err(|e| RagError::IndexError(format!("failed to serialize index: {e}")))?;

        let written = match tokio::fs::write(&tmp, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            error!(path = %path.display(), error = %e, "failed to persist index");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(path = %path.display(), fingerprint = %persisted.fingerprint, "persisted index");
        Ok(())
    }

    async fn open_index(
        &self,
        persisted: PersistedCollection,
        origin: IndexOrigin,
    ) -> Result<Arc<GuidelineIndex>> {
        let store = InMemoryVectorStore::new();
        store.create_collection(&persisted.collection, persisted.dimensions).await?;
        store.upsert(&persisted.collection, &persisted.chunks).await?;

        Ok(Arc::new(GuidelineIndex {
            collection: persisted.collection,
            fingerprint: persisted.fingerprint,
            dimensions: persisted.dimensions,
            chunk_count: persisted.chunks.len(),
            origin,
            store: Arc::new(store),
            embedder: self.embedder.clone(),
        }))
    }
}
