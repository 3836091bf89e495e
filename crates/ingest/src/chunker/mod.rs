//! Greedy paragraph chunking with character overlap.
//!
//! Paragraphs accumulate into a buffer until adding the next one would
//! exceed the target size; the buffer is flushed and the next chunk is
//! seeded with the tail of the previous one so no statement is stranded at
//! a boundary. A paragraph that is itself oversized falls back to sentence
//! packing.

mod helpers;

#[cfg(test)]
mod tests;

use thiserror::Error;

use helpers::{char_len, clean_paragraphs, overlap_tail, split_sentences};

#[derive(Debug, Error)]
pub enum ChunkConfigError {
    #[error("chunk_overlap must be greater than zero, got {0}")]
    ZeroOverlap(usize),
    #[error("chunk_size ({size}) must be greater than chunk_overlap ({overlap})")]
    SizeNotAboveOverlap { size: usize, overlap: usize },
}

/// Splits cleaned section text into overlapping chunks.
///
/// Sizes are in characters. `chunk_size` is a soft target: a chunk may
/// exceed it by the overlap carried in from the previous chunk plus the
/// join separator, never by more.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkConfigError> {
        if chunk_overlap == 0 {
            return Err(ChunkConfigError::ZeroOverlap(chunk_overlap));
        }
        if chunk_size <= chunk_overlap {
            return Err(ChunkConfigError::SizeNotAboveOverlap {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk `text` into pieces of roughly `chunk_size` characters.
    ///
    /// Empty and whitespace-only input yields no chunks. Chunk order
    /// follows text order.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let paragraphs = clean_paragraphs(text);
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();

        for para in &paragraphs {
            if char_len(&current) + char_len(para) > self.chunk_size {
                if !current.is_empty() {
                    chunks.push(current.trim().to_string());
                }
                if char_len(para) > self.chunk_size {
                    // Oversized paragraph: pack its sentences directly.
                    // The unflushed remainder seeds the next iteration
                    // without overlap, since the preceding chunk already
                    // ends mid-paragraph text.
                    current = self.pack_sentences(para, &mut chunks);
                } else {
                    let mut seeded = overlap_tail(&current, self.chunk_overlap);
                    if !seeded.is_empty() {
                        seeded.push(' ');
                    }
                    seeded.push_str(para);
                    current = seeded;
                }
            } else {
                if !current.is_empty() {
                    current.push_str("\n\n");
                }
                current.push_str(para);
            }
        }

        let last = current.trim();
        if !last.is_empty() {
            chunks.push(last.to_string());
        }
        chunks
    }

    /// Greedily pack sentences of an oversized paragraph into chunks,
    /// returning the unflushed remainder. A lone sentence over the target
    /// size is force-split at character boundaries.
    fn pack_sentences(&self, para: &str, chunks: &mut Vec<String>) -> String {
        let mut buf = String::new();
        for sentence in split_sentences(para) {
            if char_len(&sentence) > self.chunk_size {
                if !buf.is_empty() {
                    chunks.push(buf.trim().to_string());
                }
                buf = self.split_oversized(&sentence, chunks);
                continue;
            }
            if char_len(&buf) + char_len(&sentence) > self.chunk_size && !buf.is_empty() {
                chunks.push(buf.trim().to_string());
                buf = String::new();
            }
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(&sentence);
        }
        buf
    }

    /// Force-split text with no sentence boundaries into `chunk_size`
    /// pieces, carrying the last `chunk_overlap` characters of each piece
    /// into the next one. Returns the unflushed remainder. Pieces stay
    /// untrimmed so the overlap prefix is exact.
    fn split_oversized(&self, sentence: &str, chunks: &mut Vec<String>) -> String {
        let step = self.chunk_size - self.chunk_overlap;
        let chars: Vec<char> = sentence.chars().collect();
        let mut start = 0;
        while chars.len() - start > self.chunk_size {
            chunks.push(chars[start..start + self.chunk_size].iter().collect());
            start += step;
        }
        chars[start..].iter().collect()
    }
}
