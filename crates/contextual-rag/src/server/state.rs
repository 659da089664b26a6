//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::pipeline::RagPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Indexing and query pipeline
    pipeline: RagPipeline,
}

impl AppState {
    /// Create new application state from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state (backend: {:?})...", config.backend);
        let pipeline = RagPipeline::from_config(config).await?;
        Ok(Self::from_pipeline(pipeline))
    }

    /// Wrap an already-built pipeline
    pub fn from_pipeline(pipeline: RagPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { pipeline }),
        }
    }

    /// The RAG pipeline
    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        self.inner.pipeline.config()
    }
}
