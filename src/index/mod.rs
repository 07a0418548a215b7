//! In-memory vector index over one document's chunks
//!
//! The index is built once per ingestion and never mutated afterwards;
//! the engine swaps whole indexes in behind an `Arc`. Search is
//! brute-force cosine similarity.

use crate::chunk::Chunk;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// A chunk together with its embedding
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Immutable embedding index for a single document
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<IndexEntry>,
    dimension: usize,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("model", &self.embedder.model_name())
            .field("entries", &self.entries.len())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl EmbeddingIndex {
    /// Embed every chunk and build a fresh index
    pub async fn build(
        embedder: Arc<dyn Embedder>,
        chunks: Vec<Chunk>,
        batch_size: usize,
    ) -> Result<Self> {
        Self::build_with_progress(embedder, chunks, batch_size, None).await
    }

    /// Like [`EmbeddingIndex::build`], reporting embedded-chunk counts after each batch
    pub async fn build_with_progress(
        embedder: Arc<dyn Embedder>,
        chunks: Vec<Chunk>,
        batch_size: usize,
        on_batch: Option<&(dyn Fn(usize) + Send + Sync)>,
    ) -> Result<Self> {
        let dimension = embedder.dimension();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_in_batches(embedder.as_ref(), texts, batch_size, on_batch).await?;

        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(Error::EmbeddingDimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        info!(
            "Indexed {} chunks with {} ({} dims)",
            entries.len(),
            embedder.model_name(),
            dimension
        );

        Ok(Self {
            embedder,
            entries,
            dimension,
        })
    }

    /// Top `k` chunks by cosine similarity to `query`.
    ///
    /// Scores are descending; equal scores keep document order.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<(Chunk, f32)>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(vec![query.to_string()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Embedder returned no query vector".to_string()))?;
        if query_vector.len() != self.dimension {
            return Err(Error::EmbeddingDimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<(&IndexEntry, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry, cosine_similarity(&query_vector, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.chunk.ordinal.cmp(&b.0.chunk.ordinal))
        });
        scored.truncate(k);

        debug!(
            "Search returned {} results (best {:.3})",
            scored.len(),
            scored.first().map(|s| s.1).unwrap_or(0.0)
        );

        Ok(scored
            .into_iter()
            .map(|(entry, score)| (entry.chunk.clone(), score))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Chunks in document order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}

/// Cosine similarity between two vectors (0.0 for mismatched or zero vectors)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
