//! End-to-end RAG pipeline: indexing and question answering

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerGenerator;
use crate::ingestion::{ContextualAnnotator, PdfLoader, TextChunker};
use crate::processing::IndexBuilder;
use crate::providers::{ModelProviders, VectorStoreProvider};
use crate::retrieval::Retriever;
use crate::storage::SqliteVectorStore;
use crate::types::{Document, DocumentSummary, IndexReport, QueryRequest, QueryResponse};

/// Health of each backing service
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub llm: bool,
    pub embeddings: bool,
    pub vector_store: bool,
}

impl HealthReport {
    /// Whether every service is healthy
    pub fn all_healthy(&self) -> bool {
        self.llm && self.embeddings && self.vector_store
    }
}

/// The RAG pipeline, owning providers, the index, and the document registry
pub struct RagPipeline {
    config: RagConfig,
    providers: ModelProviders,
    store: Arc<dyn VectorStoreProvider>,
    builder: IndexBuilder,
    retriever: Retriever,
    generator: AnswerGenerator,
    /// Serializes index rebuilds
    rebuild_lock: Mutex<()>,
    /// Documents in the current index
    documents: DashMap<Uuid, DocumentSummary>,
}

impl RagPipeline {
    /// Build the pipeline from configuration: model providers for the
    /// configured backend and the on-disk SQLite vector store
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        let providers = ModelProviders::from_config(&config)?;
        let store = SqliteVectorStore::from_config(&config.vector_db)?;
        Self::new(config, providers, Arc::new(store)).await
    }

    /// Build the pipeline over explicit providers and store
    pub async fn new(
        config: RagConfig,
        providers: ModelProviders,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = TextChunker::from_config(&config.chunking)?;
        let annotator = ContextualAnnotator::new(providers.llm.clone(), &config.annotation);
        let builder = IndexBuilder::new(
            chunker,
            annotator,
            providers.embedder.clone(),
            store.clone(),
            config.embeddings.batch_size,
        );
        let retriever = Retriever::new(
            providers.embedder.clone(),
            store.clone(),
            config.retrieval.similarity_threshold,
        );
        let generator = AnswerGenerator::new(providers.llm.clone());

        let documents = DashMap::new();
        for doc in store.documents().await? {
            documents.insert(doc.id, doc);
        }
        if !documents.is_empty() {
            tracing::info!("Loaded {} indexed documents from {}", documents.len(), store.name());
        }

        Ok(Self {
            config,
            providers,
            store,
            builder,
            retriever,
            generator,
            rebuild_lock: Mutex::new(()),
            documents,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Load PDFs from disk and rebuild the index from them
    pub async fn index_paths(&self, paths: &[PathBuf]) -> Result<IndexReport> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.clone();
            let doc = tokio::task::spawn_blocking(move || PdfLoader::load_path(&path))
                .await
                .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
            documents.push(doc);
        }
        self.index_documents(documents).await
    }

    /// Load uploaded PDFs and rebuild the index from them
    pub async fn index_uploads(&self, uploads: Vec<(String, Bytes)>) -> Result<IndexReport> {
        let mut documents = Vec::with_capacity(uploads.len());
        for (filename, data) in uploads {
            let doc = tokio::task::spawn_blocking(move || PdfLoader::load_bytes(&filename, &data))
                .await
                .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
            documents.push(doc);
        }
        self.index_documents(documents).await
    }

    /// Rebuild the index from loaded documents, replacing whatever was indexed before
    pub async fn index_documents(&self, documents: Vec<Document>) -> Result<IndexReport> {
        if documents.is_empty() {
            return Err(Error::InvalidRequest("No documents to index".to_string()));
        }

        let _guard = self.rebuild_lock.lock().await;
        tracing::info!("Rebuilding index from {} documents", documents.len());

        let report = self.builder.build(&documents).await?;

        self.documents.clear();
        for doc in &report.documents {
            self.documents.insert(doc.id, doc.clone());
        }

        Ok(report)
    }

    /// Answer a question from the current index
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let start = Instant::now();

        let question = request.question.trim();
        if question.is_empty() {
            return Err(Error::InvalidRequest("Question must not be empty".to_string()));
        }

        let mode = request.mode.unwrap_or(self.config.retrieval.default_mode);
        let requested_k = request.top_k.unwrap_or(self.config.retrieval.top_k);
        let top_k = requested_k.min(self.config.retrieval.max_top_k);
        if top_k < requested_k {
            tracing::debug!("Clamping top_k {} to {}", requested_k, top_k);
        }

        tracing::info!("Query ({}, k = {}): {}", mode, top_k, question);

        let retrieved = self.retriever.retrieve(question, top_k).await?;
        let result = self.generator.generate(question, &retrieved, mode).await?;

        Ok(QueryResponse {
            question: question.to_string(),
            result,
            chunks_retrieved: retrieved.len(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Documents in the current index, ordered by file name
    pub fn documents(&self) -> Vec<DocumentSummary> {
        let mut docs: Vec<DocumentSummary> =
            self.documents.iter().map(|entry| entry.value().clone()).collect();
        docs.sort_by(|a, b| a.filename.cmp(&b.filename).then(a.id.cmp(&b.id)));
        docs
    }

    /// Whether an index rebuild is in progress
    pub fn is_rebuilding(&self) -> bool {
        self.rebuild_lock.try_lock().is_err()
    }

    /// Whether the index holds any chunks
    pub async fn is_indexed(&self) -> Result<bool> {
        Ok(!self.store.is_empty().await?)
    }

    /// Check every backing service
    pub async fn health(&self) -> HealthReport {
        let (llm, embeddings, vector_store) = tokio::join!(
            self.providers.llm.health_check(),
            self.providers.embedder.health_check(),
            self.store.health_check(),
        );

        HealthReport {
            llm: llm.unwrap_or(false),
            embeddings: embeddings.unwrap_or(false),
            vector_store: vector_store.unwrap_or(false),
        }
    }

    /// Names of the configured backends, for diagnostics
    pub fn backend_names(&self) -> (&str, &str, &str) {
        (
            self.providers.llm.name(),
            self.providers.embedder.name(),
            self.store.name(),
        )
    }
}
