//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for different embedding backends
//! - A deterministic hashing backend that needs no model download
//! - FastEmbed (local ONNX) and local-runtime HTTP backends
//! - Batch processing for efficiency

#[cfg(feature = "local-embed")]
mod fastembed_impl;
mod hashing;
mod http_backend;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;
pub use hashing::*;
pub use http_backend::*;

use crate::config::{EmbeddingConfig, RuntimeConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Scale a vector to unit length (zero vectors are returned unchanged)
pub fn normalize_embedding(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(
    config: &EmbeddingConfig,
    runtime: &RuntimeConfig,
) -> Result<Arc<dyn Embedder>> {
    match config.backend.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(config.resolved_dimension()))),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            &runtime.url,
            &config.model,
            config.resolved_dimension(),
            runtime.timeout(),
        )?)),
        #[cfg(feature = "local-embed")]
        "fastembed" => Ok(Arc::new(FastEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embed"))]
        "fastembed" => Err(Error::Config(
            "The fastembed backend requires the 'local-embed' feature".to_string(),
        )),
        other => Err(Error::Config(format!(
            "Unsupported embedding backend '{}'",
            other
        ))),
    }
}

/// Embed `texts` in batches, reporting the number of texts done after each batch
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
    on_batch: Option<&(dyn Fn(usize) + Send + Sync)>,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let total = texts.len();
    let mut all_embeddings = Vec::with_capacity(total);

    for chunk in texts.chunks(batch_size) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let expected = batch_texts.len();
        let embeddings = embedder.embed(batch_texts).await?;
        if embeddings.len() != expected {
            return Err(Error::Embedding(format!(
                "Backend returned {} embeddings for {} texts",
                embeddings.len(),
                expected
            )));
        }
        all_embeddings.extend(embeddings);
        debug!("Embedded {}/{} texts", all_embeddings.len(), total);
        if let Some(report) = on_batch {
            report(all_embeddings.len());
        }
    }

    Ok(all_embeddings)
}
