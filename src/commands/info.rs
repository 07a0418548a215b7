//! Info command implementation

use crate::engine::{DocumentInfo, DocumentProcessor, EngineStatus, QaEngine};
use crate::error::Result;
use std::path::Path;

/// Load `pdf` and report what was extracted from it
pub async fn cmd_info(engine: &QaEngine, pdf: &Path) -> Result<DocumentInfo> {
    engine.process_pdf(pdf).await
}

/// Print document metadata to console
pub fn print_document_info(info: &DocumentInfo) {
    println!("\n📄 {}\n", info.file_name);
    println!("Path: {}", info.path.display());
    println!("Id: {}", info.id);
    println!("Pages: {}", info.page_count);
    println!("Characters: {}", info.char_count);
    println!("Chunks: {}", info.chunk_count);
    println!("Loaded: {}", info.loaded_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

/// Print an engine status snapshot
pub fn print_status(status: &EngineStatus) {
    let state = if status.ready { "✓ ready" } else { "✗ not ready" };
    println!("Engine: {} ({:?})", state, status.state);
    println!(
        "Document: {}",
        status.current_file.as_deref().unwrap_or("(none)")
    );
    println!("Chunks: {}", status.chunk_count);
    println!("History: {} turn(s)", status.history_count);
}
