//! Configuration for the RAG system
//!
//! Configuration is resolved in three layers: built-in defaults, an optional
//! TOML file, then environment overrides. The resulting [`RagConfig`] is passed
//! explicitly to every component.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::query::AnswerMode;

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "CONTEXTUAL_RAG_CONFIG";
/// Environment variable holding the OpenAI API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the server host
pub const HOST_ENV: &str = "CONTEXTUAL_RAG_HOST";
/// Environment variable overriding the server port
pub const PORT_ENV: &str = "CONTEXTUAL_RAG_PORT";
/// Environment variable overriding the vector database path
pub const DB_PATH_ENV: &str = "CONTEXTUAL_RAG_DB";

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Backend provider (openai or ollama)
    pub backend: BackendProvider,
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI API configuration
    pub openai: OpenAiConfig,
    /// Ollama configuration
    pub ollama: OllamaConfig,
    /// Chat model configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Contextual annotation configuration
    pub annotation: AnnotationConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
}

impl RagConfig {
    /// Load configuration from an explicit TOML file, the file named by
    /// `CONTEXTUAL_RAG_CONFIG`, or defaults, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_toml_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(OPENAI_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.openai.api_key = Some(key);
        }
        if let Some(host) = lookup(HOST_ENV) {
            self.server.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid {}: {}", PORT_ENV, port),
            }
        }
        if let Some(path) = lookup(DB_PATH_ENV) {
            self.vector_db.storage_path = PathBuf::from(path);
        }
    }

    /// Validate that parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::Config(format!(
                "llm.temperature ({}) must be within 0.0..=2.0",
                self.llm.temperature
            )));
        }
        if self.vector_db.collection.trim().is_empty() {
            return Err(Error::Config("vector_db.collection must not be empty".to_string()));
        }
        Ok(())
    }

    /// The OpenAI API key, required when the OpenAI backend is selected
    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "OpenAI backend selected but no API key configured (set {})",
                    OPENAI_API_KEY_ENV
                ))
            })
    }
}

/// Backend provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// OpenAI chat completions + embeddings
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

/// OpenAI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key, usually supplied through `OPENAI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Chat model configuration, shared by annotation and answer generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat model name
    pub chat_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions (1536 for text-embedding-3-small)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 64,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 3500,
            chunk_overlap: 0,
        }
    }
}

/// What to do when the model cannot annotate a chunk
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationFailurePolicy {
    /// Abort the whole index build; the previous index stays in place
    #[default]
    FailBuild,
    /// Drop the chunk from the index and log a warning
    SkipChunk,
}

/// Contextual annotation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Failure policy for chunk annotation
    pub failure_policy: AnnotationFailurePolicy,
    /// Maximum characters of the full document quoted in the annotation prompt
    pub max_document_chars: usize,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            failure_policy: AnnotationFailurePolicy::FailBuild,
            max_document_chars: 100_000,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default number of chunks to retrieve
    pub top_k: usize,
    /// Upper bound accepted for a request's top_k
    pub max_top_k: usize,
    /// Minimum similarity score (0.0 disables filtering)
    pub similarity_threshold: f32,
    /// Answer mode used when a request does not name one
    pub default_mode: AnswerMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_top_k: 10,
            similarity_threshold: 0.0,
            default_mode: AnswerMode::AnswerOnly,
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Directory holding the vector database
    pub storage_path: PathBuf,
    /// Collection name
    pub collection: String,
}

impl VectorDbConfig {
    /// Path of the SQLite file inside the storage directory
    pub fn database_file(&self) -> PathBuf {
        self.storage_path.join("vectors.sqlite3")
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./my_context_db"),
            collection: "my_context_db".to_string(),
        }
    }
}
