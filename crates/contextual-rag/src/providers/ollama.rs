//! Ollama client for local generation and embeddings with retry logic

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

/// Ollama API client implementing both the LLM and embedding providers
pub struct OllamaClient {
    client: Client,
    base_url: String,
    generate_model: String,
    embed_model: String,
    temperature: f32,
    dimensions: usize,
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a Value>,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &RagConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.ollama.base_url.trim_end_matches('/').to_string(),
            generate_model: config.llm.chat_model.clone(),
            embed_model: config.embeddings.model.clone(),
            temperature: config.llm.temperature,
            dimensions: config.embeddings.dimensions,
            max_retries: config.llm.max_retries,
        })
    }

    /// Call `/api/generate`, optionally constraining the output to a JSON schema
    async fn generate_raw(&self, prompt: &str, format: Option<&Value>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.generate_model,
            prompt,
            stream: false,
            format,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };
        let body = serde_json::to_value(&request)?;

        tracing::debug!("Generating with model: {}", self.generate_model);

        retry_request(self.max_retries, || {
            let url = url.clone();
            let body = body.clone();

            async move {
                let response = self
                    .client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(Error::llm(format!(
                        "Generation failed: HTTP {} - {}",
                        status, text
                    )));
                }

                let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                    Error::llm(format!("Failed to parse generation response: {}", e))
                })?;

                Ok(generate_response.response)
            }
        })
        .await
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_raw(prompt, None).await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        _schema_name: &str,
        schema: &Value,
    ) -> Result<Value> {
        let content = self.generate_raw(prompt, Some(schema)).await?;
        serde_json::from_str(&content)
            .map_err(|e| Error::llm(format!("Structured output was not valid JSON: {}", e)))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.generate_model
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        retry_request(self.max_retries, || {
            let url = url.clone();

            async move {
                let request = EmbedRequest {
                    model: &self.embed_model,
                    prompt: text,
                };

                let response = self
                    .client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(Error::embedding(format!(
                        "Embedding failed: HTTP {}",
                        response.status()
                    )));
                }

                let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                Ok(embed_response.embedding)
            }
        })
        .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        LlmProvider::health_check(self).await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
