//! Similarity search followed by relevance compression.

use std::sync::Arc;

use tracing::{error, info};

use crate::compression::DocumentCompressor;
use crate::document::Chunk;
use crate::error::Result;
use crate::index::GuidelineIndex;

/// A retriever bound to one [`GuidelineIndex`].
///
/// [`retrieve`](CompressionRetriever::retrieve) fetches the `top_k` nearest
/// chunks, then lets the compressor drop or shorten them. The result never
/// holds more than `top_k` chunks.
pub struct CompressionRetriever {
    index: Arc<GuidelineIndex>,
    compressor: Arc<dyn DocumentCompressor>,
    top_k: usize,
}

impl CompressionRetriever {
    /// Bind a retriever to `index`.
    pub fn new(
        index: Arc<GuidelineIndex>,
        compressor: Arc<dyn DocumentCompressor>,
        top_k: usize,
    ) -> Self {
        Self { index, compressor, top_k }
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<GuidelineIndex> {
        &self.index
    }

    /// The number of candidates fetched before compression.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve the chunks relevant to `query`, most similar first.
    ///
    /// # Errors
    ///
    /// Search and compression-model errors propagate.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>> {
        let candidates = self.index.search(query, self.top_k).await?;
        let candidate_count = candidates.len();

        let mut retained = self.compressor.compress(query, candidates).await.map_err(|e| {
            error!(error = %e, "compression failed");
            e
        })?;
        retained.truncate(self.top_k);

        info!(candidate_count, retained = retained.len(), "retrieved relevant documents");
        Ok(retained.into_iter().map(|r| r.chunk.without_embedding()).collect())
    }
}
