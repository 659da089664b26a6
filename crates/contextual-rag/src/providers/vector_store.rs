//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocumentSummary, EnrichedChunk, VectorRecord};

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: EnrichedChunk,
    /// Cosine similarity (higher is more similar)
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `SqliteVectorStore`: SQLite-backed collection with brute-force cosine search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Atomically replace the whole collection with `records`
    ///
    /// Readers see either the previous collection or the new one, never a mix.
    /// On error the previous collection is left untouched.
    async fn replace_all(
        &self,
        records: Vec<VectorRecord>,
        documents: Vec<DocumentSummary>,
    ) -> Result<()>;

    /// Search for the `top_k` most similar chunks, best first
    async fn search(&self, query_embedding: &[f32], top_k: usize)
        -> Result<Vec<VectorSearchResult>>;

    /// Documents in the current collection
    async fn documents(&self) -> Result<Vec<DocumentSummary>>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
