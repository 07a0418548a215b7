//! Retrieval of supporting chunks for a question

use crate::chunk::Chunk;
use crate::error::Result;
use crate::index::EmbeddingIndex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A chunk selected as supporting context, with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Selects the top-k chunks above a similarity threshold
#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(k: usize, min_score: f32) -> Self {
        Self { k, min_score }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Retrieve supporting chunks for `query`, most relevant first.
    ///
    /// An empty result means nothing in the document cleared the threshold.
    pub async fn retrieve(
        &self,
        index: &EmbeddingIndex,
        query: &str,
    ) -> Result<Vec<RetrievedChunk>> {
        let hits = index.search(query, self.k).await?;
        let total = hits.len();
        let kept = self.filter_by_score(
            hits.into_iter()
                .map(|(chunk, score)| RetrievedChunk { chunk, score })
                .collect(),
        );
        debug!(
            "Retrieved {}/{} chunks above {}",
            kept.len(),
            total,
            self.min_score
        );
        Ok(kept)
    }

    /// Filter results by minimum score, preserving order
    pub fn filter_by_score(&self, results: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
        results
            .into_iter()
            .filter(|r| r.score >= self.min_score)
            .collect()
    }
}
