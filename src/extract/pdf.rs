//! PDF extraction via lopdf: per-page text, non-blank pages joined with
//! blank lines.

use super::{DocumentExtractor, ExtractedDocument};
use crate::error::{ExtractError, ExtractResult};
use lopdf::Document;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug)]
pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn supports(&self, extension: &str) -> bool {
        extension == "pdf"
    }

    fn extract(&self, path: &Path, source: &str) -> ExtractResult<ExtractedDocument> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let doc = Document::load_mem(&bytes).map_err(|e| ExtractError::Malformed {
            format: "pdf",
            path: path.to_path_buf(),
            reason: format!("not a valid PDF: {e}"),
        })?;

        if doc.is_encrypted() {
            return Err(ExtractError::Malformed {
                format: "pdf",
                path: path.to_path_buf(),
                reason: "document is encrypted".to_string(),
            });
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let mut pages = Vec::new();
        for number in &page_numbers {
            let text = doc
                .extract_text(&[*number])
                .map_err(|e| ExtractError::Malformed {
                    format: "pdf",
                    path: path.to_path_buf(),
                    reason: format!("text extraction failed on page {number}: {e}"),
                })?;
            let text = text.trim().to_string();
            if !text.is_empty() {
                pages.push(text);
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert("format".to_string(), "pdf".to_string());
        metadata.insert("pages".to_string(), page_numbers.len().to_string());

        Ok(ExtractedDocument {
            content: pages.join("\n\n"),
            source: source.to_string(),
            metadata,
        })
    }
}
