//! KGX Parser - Document-to-text extraction
//!
//! Feeds the extraction pipeline with plain text. Supported sources:
//! - PDF documents (via pdf-extract, with optional page selection)
//! - Markdown files
//! - Plain text files
//!
//! This is an external-collaborator boundary: everything downstream of
//! `process_text` only ever sees the extracted string.

use std::path::Path;
use thiserror::Error;

pub mod pdf;

pub use pdf::PdfParser;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while turning a document into text
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF parsing error
    #[error("PDF parsing error: {0}")]
    PdfError(String),

    /// Requested pages do not exist in the document
    #[error("Page selection out of range: requested page {requested}, document has {available}")]
    PageOutOfRange { requested: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// Parsed Document Types
// ============================================================================

/// Supported file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Markdown,
    PlainText,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "md" | "markdown" => Self::Markdown,
            "txt" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Markdown => write!(f, "markdown"),
            Self::PlainText => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A document reduced to extractable text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Original file path
    pub file_path: String,

    /// Detected file type
    pub file_type: FileType,

    /// Extracted text content
    pub content: String,

    /// Page count, when the format exposes one
    pub page_count: Option<usize>,
}

impl ParsedDocument {
    /// Approximate word count of the extracted content
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse any supported file into text. PDF goes through `PdfParser`,
/// honoring the 1-based page selection; markdown and plain text are
/// read verbatim and ignore `pages`.
pub fn parse_file(path: &Path, pages: Option<&[usize]>) -> Result<ParsedDocument> {
    let file_type = FileType::from_path(path);

    match file_type {
        FileType::Pdf => PdfParser::new().parse(path, pages),
        FileType::Markdown | FileType::PlainText => {
            let content = std::fs::read_to_string(path).map_err(|e| ParserError::IoError {
                path: path.display().to_string(),
                source: e,
            })?;
            Ok(ParsedDocument {
                file_path: path.display().to_string(),
                file_type,
                content,
                page_count: None,
            })
        }
        FileType::Unknown => Err(ParserError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("pdf"), FileType::Pdf);
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("md"), FileType::Markdown);
        assert_eq!(FileType::from_extension("txt"), FileType::PlainText);
        assert_eq!(FileType::from_extension("docx"), FileType::Unknown);
    }

    #[test]
    fn test_parse_plain_text_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Marie Curie discovered radium.").unwrap();

        let doc = parse_file(file.path(), None).unwrap();
        assert_eq!(doc.file_type, FileType::PlainText);
        assert_eq!(doc.word_count(), 4);
    }

    #[test]
    fn test_parse_unknown_format_rejected() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        assert!(matches!(
            parse_file(file.path(), None),
            Err(ParserError::UnsupportedFormat(_))
        ));
    }
}
