//! Default values for configuration

/// Default local model runtime URL (Ollama)
pub fn default_runtime_url() -> String {
    std::env::var("OLLAMA_HOST")
        .ok()
        .filter(|host| !host.trim().is_empty())
        .map(|host| {
            if host.starts_with("http://") || host.starts_with("https://") {
                host
            } else {
                format!("http://{}", host)
            }
        })
        .unwrap_or_else(|| "http://127.0.0.1:11434".to_string())
}

/// Default model invocation timeout in seconds
pub fn default_runtime_timeout() -> u64 {
    120
}

/// Default model used when none is given
pub fn default_model() -> String {
    "llama2".to_string()
}

/// Default embedding backend
pub fn default_embedding_backend() -> String {
    if cfg!(feature = "local-embed") {
        "fastembed".to_string()
    } else {
        "hash".to_string()
    }
}

/// Default embedding model (sentence-transformers/all-MiniLM-L6-v2)
pub fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

/// Default embedding dimension
pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    1000
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    100
}

/// Default number of passages retrieved per question
pub fn default_retrieval_top_k() -> usize {
    3
}

/// Default minimum similarity score
pub fn default_retrieval_min_score() -> f32 {
    0.1
}

/// Default system instruction placed at the top of every prompt
pub fn default_system_instruction() -> String {
    "You are a careful assistant answering questions about a single PDF document. \
Use only the numbered passages from the document to answer. \
Cite passages by their number, like [1]. \
If the passages do not contain the answer, say that the document does not cover it."
        .to_string()
}

/// Default number of previous turns carried into the prompt
pub fn default_max_history_turns() -> usize {
    4
}

/// Default tokens kept free in the context window for the answer
pub fn default_reserve_tokens() -> usize {
    512
}
