//! Word-based text chunking with overlap

use kgx_core::{Chunk, KgxError, Result};

/// Splits text into overlapping word-based chunks
///
/// Chunk boundaries are measured in whitespace-separated words. Each
/// chunk after the first starts `chunk_size - chunk_overlap` words after
/// the previous chunk's start, so consecutive chunks share
/// `chunk_overlap` words of context.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker, validating the size/overlap relationship
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(KgxError::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(KgxError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split text into chunks
    ///
    /// Empty or whitespace-only input yields no chunks. Text shorter than
    /// the chunk size yields a single chunk.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(Chunk {
                index: chunks.len(),
                start_word: start,
                end_word: end,
                text: words[start..end].join(" "),
            });
            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}
