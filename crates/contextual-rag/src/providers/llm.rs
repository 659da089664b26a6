//! LLM provider trait for text and structured generation

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Trait for chat-model generation
///
/// Implementations:
/// - `OpenAiClient`: OpenAI chat completions (gpt-4o-mini)
/// - `OllamaClient`: Local Ollama server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate free text for a single-turn prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate a JSON value conforming to `schema`
    ///
    /// `schema_name` identifies the schema for backends that require a name
    /// (OpenAI structured outputs). The returned value is parsed JSON but is
    /// not validated against the schema; callers deserialize it themselves.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
