//! Answer generation over a retrieval result in one of three output shapes

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::{AnswerMode, GeneratedAnswer, RetrievalResult, SourceDocument};

use super::citation::{resolve_citations, QuotedCitations};
use super::prompt::{PromptBuilder, CITATIONS_SCHEMA_NAME};

/// Generates grounded answers from retrieved chunks
#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl AnswerGenerator {
    /// Create a generator backed by `llm`
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Answer `question` from `retrieved` in the requested `mode`
    ///
    /// An empty retrieval result yields the "not found" answer without
    /// calling the model.
    pub async fn generate(
        &self,
        question: &str,
        retrieved: &RetrievalResult,
        mode: AnswerMode,
    ) -> Result<GeneratedAnswer> {
        if retrieved.is_empty() {
            tracing::info!("No chunks retrieved, skipping generation");
            return Ok(GeneratedAnswer::not_found(mode));
        }

        tracing::info!(
            "Generating answer ({}) from {} chunks with model: {}",
            mode,
            retrieved.len(),
            self.llm.model()
        );

        match mode {
            AnswerMode::AnswerOnly => {
                let context = PromptBuilder::format_docs(retrieved.entries());
                let answer = self.answer(question, &context).await?;
                Ok(GeneratedAnswer::AnswerOnly { answer })
            }
            AnswerMode::AnswerWithSources => {
                let context = PromptBuilder::format_docs(retrieved.entries());
                let answer = self.answer(question, &context).await?;
                let sources = retrieved.entries().iter().map(SourceDocument::from).collect();
                Ok(GeneratedAnswer::AnswerWithSources { answer, sources })
            }
            AnswerMode::AnswerWithCitations => {
                let context = PromptBuilder::format_docs_with_metadata(retrieved.entries());
                let answer = self.answer(question, &context).await?;

                let prompt = PromptBuilder::build_citations_prompt(question, &context, &answer);
                let reply = self
                    .llm
                    .generate_structured(
                        &prompt,
                        CITATIONS_SCHEMA_NAME,
                        &PromptBuilder::citations_schema(),
                    )
                    .await?;
                let proposed: QuotedCitations = serde_json::from_value(reply)
                    .map_err(|e| Error::llm(format!("Malformed citations reply: {}", e)))?;

                let citations = resolve_citations(&proposed, retrieved.entries());
                tracing::debug!(
                    "Resolved {} of {} proposed citations",
                    citations.len(),
                    proposed.citations.len()
                );

                Ok(GeneratedAnswer::AnswerWithCitations { answer, citations })
            }
        }
    }

    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let prompt = PromptBuilder::build_rag_prompt(question, context);
        let answer = self.llm.generate(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}
