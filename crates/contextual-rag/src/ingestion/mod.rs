//! Document ingestion: PDF loading, chunking, and contextual annotation

pub mod annotator;
pub mod chunker;
pub mod loader;

pub use annotator::{AnnotatedChunks, ContextualAnnotator};
pub use chunker::TextChunker;
pub use loader::PdfLoader;
