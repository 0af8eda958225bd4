//! Plain text and Markdown extraction: read the file as UTF-8, done.

use super::{DocumentExtractor, ExtractedDocument};
use crate::error::{ExtractError, ExtractResult};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug)]
pub struct PlaintextExtractor;

impl DocumentExtractor for PlaintextExtractor {
    fn supports(&self, extension: &str) -> bool {
        matches!(extension, "txt" | "text" | "md")
    }

    fn extract(&self, path: &Path, source: &str) -> ExtractResult<ExtractedDocument> {
        let content = std::fs::read_to_string(path).map_err(|source| ExtractError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut metadata = HashMap::new();
        metadata.insert("format".to_string(), "plaintext".to_string());

        Ok(ExtractedDocument {
            content,
            source: source.to_string(),
            metadata,
        })
    }
}
