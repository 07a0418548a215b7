//! Deterministic feature-hashing embedder
//!
//! Each lower-cased Unicode word is hashed with blake3 into one of
//! `dimension` buckets; the bucket counts are L2-normalized. Lexical
//! overlap only, but fully reproducible and free of model downloads.

use super::{normalize_embedding, Embedder};
use crate::error::Result;
use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

const MODEL_NAME: &str = "blake3-feature-hash";

/// Bag-of-words embedder backed by feature hashing
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed a single text synchronously
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text.unicode_words() {
            let lower = word.to_lowercase();
            vector[self.bucket(&lower)] += 1.0;
        }
        normalize_embedding(&vector)
    }

    fn bucket(&self, word: &str) -> usize {
        let hash = blake3::hash(word.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % self.dimension as u64) as usize
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(256);
        let a = embedder.embed_one("The Eiffel Tower is in Paris.");
        let b = embedder.embed_one("The Eiffel Tower is in Paris.");

        assert_eq!(a, b);
        assert_eq!(a.len(), 256);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashEmbedder::new(256);
        assert_eq!(
            embedder.embed_one("Capital of FRANCE?"),
            embedder.embed_one("capital of france")
        );
    }

    #[test]
    fn test_overlap_scores_higher() {
        let embedder = HashEmbedder::new(1024);
        let query = embedder.embed_one("What is the capital of France?");
        let close = embedder.embed_one("Paris is the capital of France.");
        let far = embedder.embed_one("Bananas grow in tropical climates.");

        assert!(dot(&query, &close) > dot(&query, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        assert!(embedder.embed_one("").iter().all(|v| *v == 0.0));
    }
}
