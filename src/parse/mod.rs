//! Document text extraction
//!
//! This module handles:
//! - The extraction boundary the engine ingests through ([`TextExtractor`])
//! - PDF text extraction
//! - Whitespace normalization of extracted text

mod pdf;

pub use pdf::*;

use crate::error::Result;
use std::path::Path;

/// Raw text pulled out of a document, before chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Normalized document text
    pub text: String,

    /// Number of pages in the source document
    pub page_count: usize,
}

/// Anything that can turn a file on disk into plain text.
///
/// Extraction is blocking; the engine runs it on a blocking worker.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of the document at `path`.
    ///
    /// Fails with [`Error::Ingestion`](crate::error::Error::Ingestion) when the
    /// file is unreadable, not a supported format, or has no text.
    fn extract(&self, path: &Path) -> Result<ExtractedText>;
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_was_whitespace = true;
    let mut newline_count = 0;

    for c in text.chars() {
        if c.is_whitespace() || c == '\u{0c}' {
            if c == '\n' {
                newline_count += 1;
            }
            last_was_whitespace = true;
        } else if c.is_control() {
            continue;
        } else {
            // Before adding a non-whitespace char, handle accumulated whitespace
            if last_was_whitespace && !result.is_empty() {
                if newline_count >= 2 {
                    result.push_str("\n\n");
                } else if newline_count == 1 {
                    result.push('\n');
                } else {
                    result.push(' ');
                }
            }
            newline_count = 0;
            result.push(c);
            last_was_whitespace = false;
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        let input = "Hello   world\n\n\n\ntest";
        let result = normalize_whitespace(input);
        assert_eq!(result, "Hello world\n\ntest");
    }

    #[test]
    fn test_normalize_whitespace_line_breaks() {
        let input = "  first line\r\nsecond\tline\u{0c}third  ";
        assert_eq!(normalize_whitespace(input), "first line\nsecond line third");
    }

    #[test]
    fn test_normalize_blank() {
        assert_eq!(normalize_whitespace(" \n\n \t "), "");
    }
}
