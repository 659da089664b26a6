//! Top-K retrieval of enriched chunks for a question

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{RetrievalResult, RetrievedChunk};

/// Embeds questions and searches the vector store
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    similarity_threshold: f32,
}

impl Retriever {
    /// Create a retriever over `store`
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        similarity_threshold: f32,
    ) -> Self {
        Self {
            embedder,
            store,
            similarity_threshold,
        }
    }

    /// Retrieve up to `k` chunks, most similar first
    ///
    /// `k == 0` and an empty index both yield an empty result; neither calls
    /// the embedding provider.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Ok(RetrievalResult::empty());
        }
        if self.store.is_empty().await? {
            tracing::info!("Vector index is empty, nothing to retrieve");
            return Ok(RetrievalResult::empty());
        }

        let query_embedding = self.embedder.embed(question).await?;
        if query_embedding.len() != self.embedder.dimensions() {
            return Err(Error::embedding(format!(
                "Query embedding has {} dimensions, expected {}",
                query_embedding.len(),
                self.embedder.dimensions()
            )));
        }

        let hits = self.store.search(&query_embedding, k).await?;
        let entries = hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                chunk: hit.chunk,
                score: hit.similarity,
            })
            .collect();

        let result = RetrievalResult::ranked(entries, k);
        let result = if self.similarity_threshold > 0.0 {
            result.filter_below(self.similarity_threshold)
        } else {
            result
        };

        tracing::debug!("Retrieved {} chunks (k = {})", result.len(), k);
        Ok(result)
    }
}
