//! Custom error types for pdfqa

use thiserror::Error;

/// Main error type for pdfqa operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    #[error("Engine not ready: process a PDF first")]
    EngineNotReady,

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Model '{model}' invocation failed: {reason}")]
    ModelInvocationFailed { model: String, reason: String },

    #[error("Prompt needs {required} characters but the context window allows {budget}")]
    ContextWindowExceeded { required: usize, budget: usize },

    #[error("Question must not be empty")]
    EmptyQuery,

    #[error("Superseded by a newer document")]
    Superseded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Wrap a runtime failure for the given model
    pub fn invocation(model: impl Into<String>, reason: impl ToString) -> Self {
        Error::ModelInvocationFailed {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller can recover by retrying or re-prompting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::EngineNotReady
                | Error::UnknownModel(_)
                | Error::ModelInvocationFailed { .. }
                | Error::EmptyQuery
                | Error::Superseded
        )
    }
}

/// Result type alias for pdfqa
pub type Result<T> = std::result::Result<T, Error>;
