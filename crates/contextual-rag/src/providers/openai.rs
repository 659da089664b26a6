//! OpenAI client for chat completions and embeddings with retry logic

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;
use super::retry::retry_request;

/// OpenAI API client implementing both the LLM and embedding providers
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    temperature: f32,
    embed_model: String,
    dimensions: usize,
    max_retries: u32,
}

// ── Chat completions ───────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a Value,
    strict: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

// ── Embeddings ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull the `error.message` out of an OpenAI error body, falling back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

impl OpenAiClient {
    /// Create a client from configuration. Fails when no API key is configured.
    pub fn new(config: &RagConfig) -> Result<Self> {
        let api_key = config.require_openai_key()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            chat_model: config.llm.chat_model.clone(),
            temperature: config.llm.temperature,
            embed_model: config.embeddings.model.clone(),
            dimensions: config.embeddings.dimensions,
            max_retries: config.llm.max_retries,
        })
    }

    /// Only the text-embedding-3 family accepts a `dimensions` override
    fn request_dimensions(&self) -> Option<usize> {
        self.embed_model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }

    async fn chat(&self, prompt: &str, response_format: Option<ResponseFormat<'_>>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.chat_model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format,
        };
        let body = serde_json::to_value(&request)?;

        tracing::debug!("Calling chat completions with model: {}", self.chat_model);

        retry_request(self.max_retries, || {
            let url = url.clone();
            let body = body.clone();

            async move {
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(Error::llm(format!(
                        "Chat completion failed: HTTP {} - {}",
                        status,
                        error_message(&text)
                    )));
                }

                let parsed: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

                let message = parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message)
                    .ok_or_else(|| Error::llm("Chat response contained no choices"))?;

                if let Some(refusal) = message.refusal {
                    return Err(Error::llm(format!("Model refused: {}", refusal)));
                }

                Ok(message.content.unwrap_or_default())
            }
        })
        .await
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(prompt, None).await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value> {
        let format = ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaFormat {
                name: schema_name,
                schema,
                strict: true,
            },
        };
        let content = self.chat(prompt, Some(format)).await?;

        serde_json::from_str(&content)
            .map_err(|e| Error::llm(format!("Structured output was not valid JSON: {}", e)))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.chat_model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.embed_model,
            input: texts,
            dimensions: self.request_dimensions(),
        };
        let body = serde_json::to_value(&request)?;

        tracing::debug!(
            "Embedding batch of {} texts with model: {}",
            texts.len(),
            self.embed_model
        );

        let mut data = retry_request(self.max_retries, || {
            let url = url.clone();
            let body = body.clone();

            async move {
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(Error::embedding(format!(
                        "Embedding failed: HTTP {} - {}",
                        status,
                        error_message(&text)
                    )));
                }

                let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                Ok(parsed.data)
            }
        })
        .await?;

        if data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }

        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        LlmProvider::health_check(self).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}
