//! PDF document parser using pdf-extract
//!
//! Extracts text content from PDF files. Page selection works on the
//! form-feed separated pages that pdf-extract emits for multi-page
//! documents.

use std::path::Path;

use crate::{FileType, ParsedDocument, ParserError, Result};

/// PDF document parser
pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract text from a PDF file, optionally restricted to a set of
    /// 1-based page numbers.
    pub fn parse(&self, path: &Path, pages: Option<&[usize]>) -> Result<ParsedDocument> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| ParserError::PdfError(e.to_string()))?;

        // pdf-extract separates pages with form feeds
        let page_texts: Vec<&str> = text.split('\x0C').collect();
        let page_count = page_texts.len();

        let content = match pages {
            None => text,
            Some(selection) => {
                let mut selected = Vec::with_capacity(selection.len());
                for &page in selection {
                    let page_text = page
                        .checked_sub(1)
                        .and_then(|i| page_texts.get(i))
                        .ok_or(ParserError::PageOutOfRange {
                            requested: page,
                            available: page_count,
                        })?;
                    selected.push(*page_text);
                }
                selected.join("\n")
            }
        };

        Ok(ParsedDocument {
            file_path: path.display().to_string(),
            file_type: FileType::Pdf,
            content,
            page_count: Some(page_count),
        })
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}
