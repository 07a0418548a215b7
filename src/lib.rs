//! pdfqa - ask questions about a PDF, answered by a local language model
//!
//! The document is split into overlapping chunks, embedded into an
//! in-memory index, and the most relevant chunks are fed to the chosen
//! model alongside recent conversation.

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod engine;
pub mod error;
pub mod history;
pub mod index;
pub mod llm;
pub mod models;
pub mod parse;
pub mod progress;
pub mod prompt;
pub mod retrieve;

pub use engine::{DocumentProcessor, QaEngine};
pub use error::{Error, Result};
