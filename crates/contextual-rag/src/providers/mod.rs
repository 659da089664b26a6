//! Provider abstractions for embeddings, LLM, and vector storage
//!
//! This module provides trait-based abstractions that allow switching between
//! the OpenAI API and a local Ollama server.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod openai;
mod retry;
pub mod vector_store;

use std::sync::Arc;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use vector_store::{VectorSearchResult, VectorStoreProvider};

use crate::config::{BackendProvider, RagConfig};
use crate::error::Result;

/// Model-backed providers selected by configuration
#[derive(Clone)]
pub struct ModelProviders {
    /// Chat model used for annotation and answering
    pub llm: Arc<dyn LlmProvider>,
    /// Embedding model used for indexing and queries
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl ModelProviders {
    /// Build the providers for the configured backend
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        match config.backend {
            BackendProvider::OpenAi => {
                let client = Arc::new(OpenAiClient::new(config)?);
                tracing::info!(
                    "Using OpenAI backend (chat: {}, embeddings: {})",
                    config.llm.chat_model,
                    config.embeddings.model
                );
                Ok(Self {
                    llm: client.clone(),
                    embedder: client,
                })
            }
            BackendProvider::Ollama => {
                let client = Arc::new(OllamaClient::new(config)?);
                tracing::info!(
                    "Using Ollama backend at {} (chat: {}, embeddings: {})",
                    config.ollama.base_url,
                    config.llm.chat_model,
                    config.embeddings.model
                );
                Ok(Self {
                    llm: client.clone(),
                    embedder: client,
                })
            }
        }
    }
}
