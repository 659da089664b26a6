//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkSource, Document, EnrichedChunk, Page, VectorRecord};
pub use query::{AnswerMode, QueryRequest};
pub use response::{
    Citation, DocumentSummary, GeneratedAnswer, IndexReport, QueryResponse, RetrievalResult,
    RetrievedChunk, SourceDocument,
};
