//! contextual-rag: retrieval-augmented question answering over PDF documents
//!
//! Every chunk of an indexed document is enriched with a short model-written
//! description of where it sits in the document before it is embedded. Answers
//! come in three shapes: plain, with the retrieved sources, or with structured
//! citations resolved against the retrieved chunks.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{HealthReport, RagPipeline};
pub use types::{
    document::{Chunk, ChunkSource, Document, EnrichedChunk, Page},
    query::{AnswerMode, QueryRequest},
    response::{Citation, GeneratedAnswer, IndexReport, QueryResponse, RetrievalResult},
};
