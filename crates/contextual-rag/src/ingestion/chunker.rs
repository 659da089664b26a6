//! Recursive, page-aware text chunking with position tracking

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkSource, Document};

/// Byte range within a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

/// Split granularity, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Paragraph,
    Line,
    Sentence,
    Word,
    Char,
}

impl Level {
    fn finer(self) -> Option<Level> {
        match self {
            Level::Paragraph => Some(Level::Line),
            Level::Line => Some(Level::Sentence),
            Level::Sentence => Some(Level::Word),
            Level::Word => Some(Level::Char),
            Level::Char => None,
        }
    }

    /// Split `span` into contiguous pieces that together cover it exactly
    fn split(self, text: &str, span: Span) -> Vec<Span> {
        let slice = &text[span.start..span.end];
        let offset = |i: usize, len: usize| Span {
            start: span.start + i,
            end: span.start + i + len,
        };

        match self {
            Level::Paragraph => split_keeping_separator(slice, "\n\n", span.start),
            Level::Line => split_keeping_separator(slice, "\n", span.start),
            Level::Sentence => slice
                .split_sentence_bound_indices()
                .map(|(i, s)| offset(i, s.len()))
                .collect(),
            Level::Word => slice
                .split_word_bound_indices()
                .map(|(i, s)| offset(i, s.len()))
                .collect(),
            Level::Char => slice
                .char_indices()
                .map(|(i, c)| offset(i, c.len_utf8()))
                .collect(),
        }
    }
}

/// Split on `separator`, attaching it to the end of the preceding piece
fn split_keeping_separator(text: &str, separator: &str, base: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, sep) in text.match_indices(separator) {
        let end = idx + sep.len();
        spans.push(Span {
            start: base + start,
            end: base + end,
        });
        start = end;
    }
    if start < text.len() {
        spans.push(Span {
            start: base + start,
            end: base + text.len(),
        });
    }
    spans
}

/// Text chunker with configurable size and overlap, measured in characters
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. Requires `chunk_size > 0` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Create a chunker from the chunking section of the config
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunk every page of a document. Chunks never cross page boundaries.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut chunk_index = 0u32;

        for page in &doc.pages {
            for span in self.split_text(&page.content) {
                let source = ChunkSource {
                    filename: doc.filename.clone(),
                    source: doc.source.clone(),
                    page_number: page.page_number,
                };
                chunks.push(Chunk::new(
                    doc.id,
                    page.content[span.start..span.end].to_string(),
                    source,
                    chunk_index,
                    span.start,
                    span.end,
                ));
                chunk_index += 1;
            }
        }

        tracing::debug!(
            "Split {} ({} pages) into {} chunks",
            doc.filename,
            doc.pages.len(),
            chunks.len()
        );

        chunks
    }

    /// Split a text into trimmed, non-empty spans of at most `chunk_size` characters
    fn split_text(&self, text: &str) -> Vec<Span> {
        let whole = Span {
            start: 0,
            end: text.len(),
        };
        let spans = if char_len(text, whole) <= self.chunk_size {
            vec![whole]
        } else {
            self.split_recursive(text, whole, Level::Paragraph)
        };

        spans.into_iter().filter_map(|s| trim_span(text, s)).collect()
    }

    fn split_recursive(&self, text: &str, span: Span, level: Level) -> Vec<Span> {
        let mut chunks = Vec::new();
        let mut fitting = Vec::new();

        for piece in level.split(text, span) {
            if char_len(text, piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(text, &fitting));
                fitting.clear();
            }
            match level.finer() {
                Some(finer) => chunks.extend(self.split_recursive(text, piece, finer)),
                None => chunks.push(piece),
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(text, &fitting));
        }
        chunks
    }

    /// Greedily merge adjacent pieces into windows, carrying up to `chunk_overlap` characters forward
    fn merge(&self, text: &str, pieces: &[Span]) -> Vec<Span> {
        let mut merged = Vec::new();
        let mut window: VecDeque<(Span, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(text, piece);

            if total + len > self.chunk_size {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    merged.push(Span {
                        start: first.0.start,
                        end: last.0.end,
                    });
                }
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, l)) => total -= l,
                        None => break,
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            merged.push(Span {
                start: first.0.start,
                end: last.0.end,
            });
        }
        merged
    }
}

fn char_len(text: &str, span: Span) -> usize {
    text[span.start..span.end].chars().count()
}

/// Strip surrounding whitespace from a span; `None` if nothing remains
fn trim_span(text: &str, span: Span) -> Option<Span> {
    let slice = &text[span.start..span.end];
    let trimmed_start = slice.len() - slice.trim_start().len();
    let trimmed_end = slice.trim_end().len();
    if trimmed_end <= trimmed_start {
        return None;
    }
    Some(Span {
        start: span.start + trimmed_start,
        end: span.start + trimmed_end,
    })
}
