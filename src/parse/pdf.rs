//! PDF text extraction

use super::{normalize_whitespace, ExtractedText, TextExtractor};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// The PDF header must appear within the first KiB of the file
const HEADER_SEARCH_LEN: usize = 1024;

/// Extracts text from PDF files with `pdf-extract`, counting pages with `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedText> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Ingestion(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        extract_pdf_bytes(&bytes)
    }
}

/// Extract normalized text and the page count from in-memory PDF bytes
pub fn extract_pdf_bytes(bytes: &[u8]) -> Result<ExtractedText> {
    if bytes.is_empty() {
        return Err(Error::Ingestion("File is empty".to_string()));
    }

    if !has_pdf_header(bytes) {
        return Err(Error::Ingestion("File is not a PDF".to_string()));
    }

    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| Error::Ingestion(format!("Failed to parse PDF: {}", e)))?;
    let page_count = document.get_pages().len();

    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Ingestion(format!("PDF extraction failed: {}", e)))?;
    let text = normalize_whitespace(&raw);
    debug!(
        "Extracted {} characters from {} page(s)",
        text.len(),
        page_count
    );

    if text.is_empty() {
        return Err(Error::Ingestion(
            "PDF contains no extractable text".to_string(),
        ));
    }

    Ok(ExtractedText { text, page_count })
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_LEN)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Build a single-page PDF whose content stream is `content`.
///
/// Offsets in the xref table are computed so both `lopdf` and `pdf-extract`
/// accept the file.
#[cfg(test)]
pub(crate) fn single_page_pdf(content: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_text_pdf() {
        let pdf = single_page_pdf("BT /F1 12 Tf 100 700 Td (grounded answer phrase) Tj ET");
        let extracted = extract_pdf_bytes(&pdf).unwrap();

        assert_eq!(extracted.page_count, 1);
        assert!(extracted.text.contains("grounded answer phrase"));
    }

    #[test]
    fn test_blank_pdf_is_ingestion_error() {
        let pdf = single_page_pdf("BT ET");
        let err = extract_pdf_bytes(&pdf).unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
    }

    #[test]
    fn test_non_pdf_rejected() {
        let err = extract_pdf_bytes(b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));

        let err = extract_pdf_bytes(b"").unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
    }

    #[test]
    fn test_extractor_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("phrase.pdf");
        std::fs::write(
            &path,
            single_page_pdf("BT /F1 12 Tf 100 700 Td (file based phrase) Tj ET"),
        )
        .unwrap();

        let extracted = PdfExtractor::new().extract(&path).unwrap();
        assert!(extracted.text.contains("file based phrase"));
    }

    #[test]
    fn test_extractor_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = PdfExtractor::new()
            .extract(&tmp.path().join("missing.pdf"))
            .unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
    }
}
