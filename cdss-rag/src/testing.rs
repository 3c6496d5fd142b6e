//! Deterministic stand-ins for the embedding service, for tests in this and
//! downstream crates. Enabled by the `test-util` feature.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::{EmbeddingProvider, normalize};
use crate::error::Result;

/// Bag-of-words embeddings: each lowercase word is hashed into a bucket, so
/// cosine similarity tracks word overlap. Counts every text it embeds.
#[derive(Debug)]
pub struct BagOfWordsEmbedder {
    dimensions: usize,
    embedded: AtomicUsize,
}

impl BagOfWordsEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, embedded: AtomicUsize::new(0) }
    }

    /// Number of texts embedded so far.
    pub fn embedded(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedded.fetch_add(1, Ordering::SeqCst);
        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        normalize(&mut emb);
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shared_words_score_higher() {
        let embedder = BagOfWordsEmbedder::new(64);
        let stage = embedder.embed("stage C heart failure").await.unwrap();
        let same = embedder.embed("Heart failure stage C").await.unwrap();
        let other = embedder.embed("cardiac rehabilitation exercise").await.unwrap();

        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!((dot(&stage, &same) - 1.0).abs() < 1e-5);
        assert!(dot(&stage, &other) < 0.5);
        assert_eq!(embedder.embedded(), 3);
    }
}
