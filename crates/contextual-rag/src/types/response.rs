//! Response types for retrieval, answers, and indexing

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Document, EnrichedChunk};
use super::query::AnswerMode;

/// Answer returned when retrieval finds nothing to ground on
pub const NOT_FOUND_ANSWER: &str =
    "I couldn't find relevant information in the indexed documents to answer this question.";

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// The enriched chunk
    pub chunk: EnrichedChunk,
    /// Similarity score (higher is more similar)
    pub score: f32,
}

/// Ranked retrieval output: at most K entries, non-increasing score
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    entries: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    /// Rank scored chunks and keep the best `k`
    pub fn ranked(mut entries: Vec<RetrievedChunk>, k: usize) -> Self {
        entries.retain(|e| !e.score.is_nan());
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        entries.truncate(k);
        Self { entries }
    }

    /// An empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Retrieved entries, best first
    pub fn entries(&self) -> &[RetrievedChunk] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was retrieved
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries scoring below `threshold`
    pub fn filter_below(mut self, threshold: f32) -> Self {
        self.entries.retain(|e| e.score >= threshold);
        self
    }
}

/// A retrieved chunk as returned to callers in "answer + sources" mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Chunk ID
    pub id: Uuid,
    /// Source path or upload name
    pub source: String,
    /// File name
    pub title: String,
    /// Page number (1-indexed)
    pub page: u32,
    /// Enriched chunk text (description + original text)
    pub content: String,
    /// Similarity score
    pub score: f32,
}

impl From<&RetrievedChunk> for SourceDocument {
    fn from(r: &RetrievedChunk) -> Self {
        let source = r.chunk.source();
        Self {
            id: r.chunk.id(),
            source: source.source.clone(),
            title: source.filename.clone(),
            page: source.page_number,
            content: r.chunk.content(),
            score: r.score,
        }
    }
}

/// Structured citation, resolved against a retrieved chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// ID of the cited chunk
    pub id: Uuid,
    /// Source path or upload name
    pub source: String,
    /// File name
    pub title: String,
    /// Page number (1-indexed)
    pub page: u32,
    /// Verbatim sentences from the chunk that justify the answer
    pub quote: String,
    /// Whether the quote was found verbatim in the cited chunk
    pub quote_verified: bool,
}

impl Citation {
    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        format!("[Source: {}, Page {}]", self.title, self.page)
    }
}

/// Generated answer in one of the three output shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GeneratedAnswer {
    /// Free-text answer
    AnswerOnly { answer: String },
    /// Answer plus the retrieved chunks
    AnswerWithSources {
        answer: String,
        sources: Vec<SourceDocument>,
    },
    /// Answer plus structured citations
    AnswerWithCitations {
        answer: String,
        citations: Vec<Citation>,
    },
}

impl GeneratedAnswer {
    /// The answer text
    pub fn answer(&self) -> &str {
        match self {
            GeneratedAnswer::AnswerOnly { answer }
            | GeneratedAnswer::AnswerWithSources { answer, .. }
            | GeneratedAnswer::AnswerWithCitations { answer, .. } => answer,
        }
    }

    /// The mode this answer was generated in
    pub fn mode(&self) -> AnswerMode {
        match self {
            GeneratedAnswer::AnswerOnly { .. } => AnswerMode::AnswerOnly,
            GeneratedAnswer::AnswerWithSources { .. } => AnswerMode::AnswerWithSources,
            GeneratedAnswer::AnswerWithCitations { .. } => AnswerMode::AnswerWithCitations,
        }
    }

    /// Sources, when generated in "answer + sources" mode
    pub fn sources(&self) -> Option<&[SourceDocument]> {
        match self {
            GeneratedAnswer::AnswerWithSources { sources, .. } => Some(sources),
            _ => None,
        }
    }

    /// Citations, when generated in "answer + citations" mode
    pub fn citations(&self) -> Option<&[Citation]> {
        match self {
            GeneratedAnswer::AnswerWithCitations { citations, .. } => Some(citations),
            _ => None,
        }
    }

    /// The shape used when nothing was retrieved
    pub fn not_found(mode: AnswerMode) -> Self {
        let answer = NOT_FOUND_ANSWER.to_string();
        match mode {
            AnswerMode::AnswerOnly => GeneratedAnswer::AnswerOnly { answer },
            AnswerMode::AnswerWithSources => GeneratedAnswer::AnswerWithSources {
                answer,
                sources: Vec::new(),
            },
            AnswerMode::AnswerWithCitations => GeneratedAnswer::AnswerWithCitations {
                answer,
                citations: Vec::new(),
            },
        }
    }
}

/// Response from a RAG query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The question asked
    pub question: String,
    /// Generated answer
    #[serde(flatten)]
    pub result: GeneratedAnswer,
    /// Number of chunks retrieved
    pub chunks_retrieved: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResponse {
    /// The answer text
    pub fn answer(&self) -> &str {
        self.result.answer()
    }
}

/// Summary of an indexed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document ID
    pub id: Uuid,
    /// File name
    pub filename: String,
    /// Source path or upload name
    pub source: String,
    /// Number of pages in the file
    pub total_pages: u32,
    /// Number of chunks indexed for this document
    pub total_chunks: u32,
    /// Load timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl DocumentSummary {
    /// Summarize a document with its indexed chunk count
    pub fn new(doc: &Document, total_chunks: u32) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            source: doc.source.clone(),
            total_pages: doc.total_pages,
            total_chunks,
            ingested_at: doc.ingested_at,
        }
    }
}

/// Outcome of an index rebuild
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    /// Indexed documents
    pub documents: Vec<DocumentSummary>,
    /// Chunks written to the index
    pub chunks_indexed: usize,
    /// Chunks dropped because annotation failed (skip policy only)
    pub chunks_skipped: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}
