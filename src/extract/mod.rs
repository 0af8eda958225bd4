//! Document text extraction.
//!
//! Turns uploaded files into plain text for segmentation. The supported
//! formats are a closed set: plain text and Markdown, PDF, Word (`.docx`),
//! and OpenDocument (`.odt`). Anything else is rejected up front with
//! [`ExtractError::UnsupportedFormat`] so callers can map it to a client
//! error instead of a server failure.

mod office;
mod pdf;
mod plaintext;

pub use office::{DocxExtractor, OdtExtractor};
pub use pdf::PdfExtractor;
pub use plaintext::PlaintextExtractor;

use crate::error::{ExtractError, ExtractResult};
use std::collections::HashMap;
use std::path::Path;

/// Text pulled out of one uploaded file.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub content: String,
    /// Original filename, used as the chunk source label.
    pub source: String,
    pub metadata: HashMap<String, String>,
}

/// One file format handler.
pub trait DocumentExtractor: Send + Sync + std::fmt::Debug {
    /// Whether this extractor handles the file's extension.
    fn supports(&self, extension: &str) -> bool;

    /// Extracts text from the file at `path`, labelled as `source`.
    fn extract(&self, path: &Path, source: &str) -> ExtractResult<ExtractedDocument>;
}

static EXTRACTORS: &[&(dyn DocumentExtractor)] =
    &[&PlaintextExtractor, &PdfExtractor, &DocxExtractor, &OdtExtractor];

/// Finds the extractor for `path` by extension.
pub fn extractor_for(path: &Path) -> ExtractResult<&'static dyn DocumentExtractor> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    EXTRACTORS
        .iter()
        .find(|extractor| extractor.supports(&extension))
        .copied()
        .ok_or(ExtractError::UnsupportedFormat { extension })
}

/// Whether any extractor handles the filename's extension.
pub fn is_supported(filename: &str) -> bool {
    extractor_for(Path::new(filename)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert!(extractor_for(Path::new("notes.TXT")).is_ok());
        assert!(extractor_for(Path::new("resume.PDF")).is_ok());
        assert!(extractor_for(Path::new("report.Docx")).is_ok());
        assert!(extractor_for(Path::new("memo.odt")).is_ok());
    }

    #[test]
    fn unsupported_extensions_are_rejected() {
        let err = extractor_for(Path::new("sheet.xlsx")).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::UnsupportedFormat { extension } if extension == "xlsx"
        ));

        assert!(extractor_for(Path::new("no_extension")).is_err());
    }

    #[test]
    fn is_supported_matches_dispatch() {
        assert!(is_supported("a.md"));
        assert!(is_supported("b.docx"));
        assert!(is_supported("c.pdf"));
        assert!(!is_supported("d.xlsx"));
    }
}
