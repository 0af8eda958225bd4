//! Word and OpenDocument extraction.
//!
//! Both formats are zip archives holding an XML body. We pull the body entry
//! and scrape paragraph text with regular expressions rather than a full XML
//! parser; office documents put text content in well-known leaf elements
//! (`<w:t>` for Word, `<text:p>`/`<text:h>` for OpenDocument) and that is all
//! the segmenter needs.

use super::{DocumentExtractor, ExtractedDocument};
use crate::error::{ExtractError, ExtractResult};
use regex::Regex;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

#[derive(Debug)]
pub struct DocxExtractor;

#[derive(Debug)]
pub struct OdtExtractor;

static DOCX_TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").unwrap());

// `(?s)` so paragraphs spanning lines still match; `[ph]` covers both
// <text:p> and <text:h>.
static ODT_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text:[ph]\b[^>]*>(.*?)</text:[ph]>").unwrap());

static INNER_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

impl DocumentExtractor for DocxExtractor {
    fn supports(&self, extension: &str) -> bool {
        extension == "docx"
    }

    fn extract(&self, path: &Path, source: &str) -> ExtractResult<ExtractedDocument> {
        let xml = read_zip_entry(path, "word/document.xml", "docx")?;

        // Word nests text runs inside paragraph elements; split on the
        // paragraph close tag so runs in the same paragraph stay joined.
        let paragraphs: Vec<String> = xml
            .split("</w:p>")
            .filter_map(|fragment| {
                let text: String = DOCX_TEXT_RUN
                    .captures_iter(fragment)
                    .map(|cap| unescape_xml(&cap[1]))
                    .collect();
                let text = text.trim().to_string();
                (!text.is_empty()).then_some(text)
            })
            .collect();

        Ok(document(paragraphs, source, "docx"))
    }
}

impl DocumentExtractor for OdtExtractor {
    fn supports(&self, extension: &str) -> bool {
        extension == "odt"
    }

    fn extract(&self, path: &Path, source: &str) -> ExtractResult<ExtractedDocument> {
        let xml = read_zip_entry(path, "content.xml", "odt")?;

        let paragraphs: Vec<String> = ODT_PARAGRAPH
            .captures_iter(&xml)
            .filter_map(|cap| {
                let inner = INNER_TAG.replace_all(&cap[1], "");
                let text = unescape_xml(&inner).trim().to_string();
                (!text.is_empty()).then_some(text)
            })
            .collect();

        Ok(document(paragraphs, source, "odt"))
    }
}

fn document(paragraphs: Vec<String>, source: &str, format: &str) -> ExtractedDocument {
    let mut metadata = HashMap::new();
    metadata.insert("format".to_string(), format.to_string());
    metadata.insert("paragraphs".to_string(), paragraphs.len().to_string());

    ExtractedDocument {
        content: paragraphs.join("\n\n"),
        source: source.to_string(),
        metadata,
    }
}

/// Opens the archive at `path` and reads `entry` as UTF-8.
fn read_zip_entry(path: &Path, entry: &str, format: &'static str) -> ExtractResult<String> {
    let file = std::fs::File::open(path).map_err(|source| ExtractError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractError::Malformed {
        format,
        path: path.to_path_buf(),
        reason: format!("not a valid archive: {e}"),
    })?;

    let mut body = archive.by_name(entry).map_err(|_| ExtractError::Malformed {
        format,
        path: path.to_path_buf(),
        reason: format!("missing {entry}"),
    })?;

    let mut xml = String::new();
    body.read_to_string(&mut xml)
        .map_err(|e| ExtractError::Malformed {
            format,
            path: path.to_path_buf(),
            reason: format!("{entry} is not valid UTF-8: {e}"),
        })?;

    Ok(xml)
}

/// Undoes the XML escapes office writers emit. `&amp;` goes last so
/// `&amp;lt;` decodes to the literal `&lt;`.
fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_archive(entry: &str, xml: &str, suffix: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::with_suffix(suffix).unwrap();
        let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
        writer.start_file(entry, FileOptions::default()).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap();
        file
    }

    #[test]
    fn docx_paragraphs_come_out_separated() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>First paragraph, </w:t></w:r><w:r><w:t xml:space="preserve">two runs.</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second &amp; final.</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let file = write_archive("word/document.xml", xml, ".docx");

        let doc = DocxExtractor.extract(file.path(), "report.docx").unwrap();
        assert_eq!(
            doc.content,
            "First paragraph, two runs.\n\nSecond & final."
        );
        assert_eq!(doc.metadata["paragraphs"], "2");
    }

    #[test]
    fn odt_paragraphs_and_headings_are_extracted() {
        let xml = r#"<office:document-content><office:body><office:text>
            <text:h text:outline-level="1">Title</text:h>
            <text:p>Body with <text:span text:style-name="T1">styled</text:span> text.</text:p>
        </office:text></office:body></office:document-content>"#;
        let file = write_archive("content.xml", xml, ".odt");

        let doc = OdtExtractor.extract(file.path(), "memo.odt").unwrap();
        assert_eq!(doc.content, "Title\n\nBody with styled text.");
    }

    #[test]
    fn non_archive_file_is_malformed() {
        let mut file = tempfile::NamedTempFile::with_suffix(".docx").unwrap();
        write!(file, "this is not a zip").unwrap();

        let err = DocxExtractor
            .extract(file.path(), "broken.docx")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Malformed { format: "docx", .. }));
    }

    #[test]
    fn archive_without_body_entry_is_malformed() {
        let file = write_archive("mimetype", "application/whatever", ".odt");

        let err = OdtExtractor.extract(file.path(), "empty.odt").unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Malformed { format: "odt", reason, .. } if reason.contains("content.xml")
        ));
    }

    #[test]
    fn xml_entities_are_unescaped_once() {
        assert_eq!(unescape_xml("a &amp;lt; b"), "a &lt; b");
        assert_eq!(unescape_xml("&quot;hi&quot; &apos;there&apos;"), "\"hi\" 'there'");
    }
}
