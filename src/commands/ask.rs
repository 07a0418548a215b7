//! Ask command implementation

use crate::engine::{DocumentInfo, DocumentProcessor, QaEngine};
use crate::error::Result;
use crate::history::Answer;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One-shot question result
#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub document: DocumentInfo,
    pub question: String,
    pub answer: Answer,
}

/// Load `pdf` and answer a single question about it
pub async fn cmd_ask(
    engine: &QaEngine,
    pdf: &Path,
    question: &str,
    model: &str,
) -> Result<AskResult> {
    let document = engine.process_pdf(pdf).await?;
    info!("Asking {} about {}", model, document.file_name);
    let answer = engine.ask_question(question, model).await?;

    Ok(AskResult {
        document,
        question: question.trim().to_string(),
        answer,
    })
}

/// Print an answer with its citations
pub fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.text.trim());

    if answer.grounded {
        let sources: Vec<String> = answer
            .citations
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] chunk {} ({:.2})", i + 1, c.ordinal, c.score))
            .collect();
        println!("Sources: {}", sources.join(", "));
    } else {
        println!("⚠ No supporting text was found in the document for this answer.");
    }
    println!("({} · {} ms)", answer.model, answer.latency_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embed::HashEmbedder;
    use crate::history::ConversationStore;
    use crate::llm::testing::FakeRuntime;
    use crate::parse::{single_page_pdf, PdfExtractor};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ask_loads_and_answers() {
        let tmp = TempDir::new().unwrap();
        let pdf = tmp.path().join("france.pdf");
        std::fs::write(
            &pdf,
            single_page_pdf("BT /F1 12 Tf 100 700 Td (Paris is the capital of France.) Tj ET"),
        )
        .unwrap();

        let mut config = Config::default();
        config.embedding.backend = "hash".to_string();
        config.embedding.dimension = 512;
        let engine = QaEngine::with_components(
            &config,
            Arc::new(PdfExtractor::new()),
            Arc::new(HashEmbedder::new(512)),
            Arc::new(FakeRuntime::default()),
            Arc::new(ConversationStore::new()),
        )
        .unwrap();

        let result = cmd_ask(&engine, &pdf, " What is the capital of France? ", "mistral")
            .await
            .unwrap();

        assert_eq!(result.document.file_name, "france.pdf");
        assert_eq!(result.question, "What is the capital of France?");
        assert_eq!(result.answer.model, "mistral");
        assert!(result.answer.grounded);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["answer"]["citations"][0]["ordinal"], 0);
    }
}
