//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text content from a single page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
}

/// A loaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document ID, derived from the content hash
    pub id: Uuid,
    /// File name, used as the citation title
    pub filename: String,
    /// Source path or upload name
    pub source: String,
    /// SHA-256 of the extracted text
    pub content_hash: String,
    /// Total number of pages in the file (including pages without text)
    pub total_pages: u32,
    /// Pages that carry text
    pub pages: Vec<Page>,
    /// Load timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a document from extracted pages.
    ///
    /// The ID depends only on the page texts, so loading the same file twice
    /// yields the same document identity.
    pub fn from_pages(
        filename: impl Into<String>,
        source: impl Into<String>,
        pages: Vec<Page>,
        total_pages: u32,
    ) -> Self {
        let content_hash = hash_pages(&pages);
        Self {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, content_hash.as_bytes()),
            filename: filename.into(),
            source: source.into(),
            content_hash,
            total_pages,
            pages,
            ingested_at: chrono::Utc::now(),
        }
    }

    /// Full document text, pages joined by blank lines
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn hash_pages(pages: &[Page]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for page in pages {
        hasher.update(page.page_number.to_le_bytes());
        hasher.update(page.content.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// File name (citation title)
    pub filename: String,
    /// Source path or upload name
    pub source: String,
    /// Page number (1-indexed)
    pub page_number: u32,
}

/// A contiguous span of page text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk ID, derived from the document ID and position
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub text: String,
    /// Source information for citations
    pub source: ChunkSource,
    /// Chunk index within the document
    pub chunk_index: u32,
    /// Byte offsets within the page
    pub byte_start: usize,
    pub byte_end: usize,
}

impl Chunk {
    /// Create a new chunk with a position-derived ID
    pub fn new(
        document_id: Uuid,
        text: String,
        source: ChunkSource,
        chunk_index: u32,
        byte_start: usize,
        byte_end: usize,
    ) -> Self {
        let key = format!("{}:{}:{}", source.page_number, chunk_index, byte_start);
        Self {
            id: Uuid::new_v5(&document_id, key.as_bytes()),
            document_id,
            text,
            source,
            chunk_index,
            byte_start,
            byte_end,
        }
    }
}

/// A chunk together with its model-generated contextual description.
///
/// Fields are private: an enriched chunk is built once from a successful
/// annotation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnrichedChunkFields")]
pub struct EnrichedChunk {
    chunk: Chunk,
    context: String,
}

/// Wire form of [`EnrichedChunk`], validated through [`EnrichedChunk::new`]
#[derive(Deserialize)]
struct EnrichedChunkFields {
    chunk: Chunk,
    context: String,
}

impl TryFrom<EnrichedChunkFields> for EnrichedChunk {
    type Error = String;

    fn try_from(fields: EnrichedChunkFields) -> Result<Self, Self::Error> {
        let id = fields.chunk.id;
        EnrichedChunk::new(fields.chunk, fields.context)
            .ok_or_else(|| format!("enriched chunk {} has an empty context", id))
    }
}

impl EnrichedChunk {
    /// Pair a chunk with its description. Returns `None` for a blank description.
    pub fn new(chunk: Chunk, context: impl Into<String>) -> Option<Self> {
        let context = context.into().trim().to_string();
        if context.is_empty() {
            return None;
        }
        Some(Self { chunk, context })
    }

    /// The underlying chunk
    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    /// The contextual description
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Text that gets embedded and shown to the model: description, blank line, chunk
    pub fn content(&self) -> String {
        format!("{}\n\n{}", self.context, self.chunk.text)
    }

    /// Chunk ID
    pub fn id(&self) -> Uuid {
        self.chunk.id
    }

    /// Source information
    pub fn source(&self) -> &ChunkSource {
        &self.chunk.source
    }
}

/// An enriched chunk with its embedding, as stored in the vector database
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// The enriched chunk
    pub chunk: EnrichedChunk,
    /// Embedding of `chunk.content()`
    pub embedding: Vec<f32>,
}
