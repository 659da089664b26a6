//! Full index rebuild: chunk, annotate, embed, then swap the collection

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::{ContextualAnnotator, TextChunker};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Document, DocumentSummary, EnrichedChunk, IndexReport, VectorRecord};

/// Builds the vector index from loaded documents
#[derive(Clone)]
pub struct IndexBuilder {
    chunker: TextChunker,
    annotator: ContextualAnnotator,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    batch_size: usize,
}

impl IndexBuilder {
    /// Create an index builder
    pub fn new(
        chunker: TextChunker,
        annotator: ContextualAnnotator,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        batch_size: usize,
    ) -> Self {
        Self {
            chunker,
            annotator,
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Chunk and annotate `documents`, then rebuild the index from the result
    ///
    /// Nothing is written until every chunk has been annotated and embedded,
    /// so any failure leaves the previous index in place. Under the skip
    /// policy a document whose chunks all fail annotation fails the build.
    pub async fn build(&self, documents: &[Document]) -> Result<IndexReport> {
        let start = Instant::now();

        let mut seen = HashSet::new();
        let documents: Vec<Document> = documents
            .iter()
            .filter(|doc| {
                let fresh = seen.insert(doc.id);
                if !fresh {
                    tracing::warn!("Skipping duplicate document {} ({})", doc.filename, doc.id);
                }
                fresh
            })
            .cloned()
            .collect();

        let mut enriched = Vec::new();
        let mut skipped = 0;
        for doc in &documents {
            let chunks = self.chunker.chunk_document(doc);
            tracing::info!("[{}] Created {} chunks, annotating...", doc.filename, chunks.len());

            let annotated = self.annotator.annotate_document(doc, chunks).await?;
            if annotated.chunks.is_empty() && annotated.skipped > 0 {
                return Err(Error::llm(format!(
                    "All {} chunks of {} failed annotation; keeping the previous index",
                    annotated.skipped, doc.filename
                )));
            }
            skipped += annotated.skipped;
            enriched.extend(annotated.chunks);
        }

        let mut report = self.rebuild(&enriched, &documents).await?;
        report.chunks_skipped = skipped;
        report.processing_time_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Embed `chunks` and replace the whole collection with them
    pub async fn rebuild(
        &self,
        chunks: &[EnrichedChunk],
        documents: &[Document],
    ) -> Result<IndexReport> {
        let start = Instant::now();
        let embeddings = self.embed_all(chunks).await?;

        let mut per_document: HashMap<Uuid, u32> = HashMap::new();
        for chunk in chunks {
            *per_document.entry(chunk.chunk().document_id).or_default() += 1;
        }
        let summaries: Vec<DocumentSummary> = documents
            .iter()
            .map(|doc| {
                DocumentSummary::new(doc, per_document.get(&doc.id).copied().unwrap_or(0))
            })
            .collect();

        let records: Vec<VectorRecord> = chunks
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorRecord { chunk, embedding })
            .collect();
        let chunks_indexed = records.len();

        self.store.replace_all(records, summaries.clone()).await?;

        tracing::info!(
            "Indexed {} chunks from {} documents into {}",
            chunks_indexed,
            summaries.len(),
            self.store.name()
        );

        Ok(IndexReport {
            documents: summaries,
            chunks_indexed,
            chunks_skipped: 0,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Embed enriched contents in batches, checking count and dimension
    async fn embed_all(&self, chunks: &[EnrichedChunk]) -> Result<Vec<Vec<f32>>> {
        let expected = self.embedder.dimensions();
        let mut embeddings = Vec::with_capacity(chunks.len());

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content()).collect();
            let batch_embeddings = self.embedder.embed_batch(&texts).await?;

            if batch_embeddings.len() != texts.len() {
                return Err(Error::embedding(format!(
                    "Batch {}: expected {} embeddings, got {}",
                    i,
                    texts.len(),
                    batch_embeddings.len()
                )));
            }
            if let Some(bad) = batch_embeddings.iter().find(|e| e.len() != expected) {
                return Err(Error::embedding(format!(
                    "Batch {}: expected {} dimensions, got {}",
                    i,
                    expected,
                    bad.len()
                )));
            }

            tracing::debug!("Embedded batch {} ({} chunks)", i, batch.len());
            embeddings.extend(batch_embeddings);
        }

        Ok(embeddings)
    }
}
