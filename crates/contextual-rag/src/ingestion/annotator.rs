//! Contextual annotation: a model-written description for every chunk

use std::sync::Arc;

use crate::config::{AnnotationConfig, AnnotationFailurePolicy};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;
use crate::types::{Chunk, Document, EnrichedChunk};

/// Enriched chunks of one document plus the number of chunks dropped
#[derive(Debug, Default)]
pub struct AnnotatedChunks {
    /// Chunks that received a description, in input order
    pub chunks: Vec<EnrichedChunk>,
    /// Chunks dropped under [`AnnotationFailurePolicy::SkipChunk`]
    pub skipped: usize,
}

/// Asks the chat model how each chunk fits into its document
#[derive(Clone)]
pub struct ContextualAnnotator {
    llm: Arc<dyn LlmProvider>,
    policy: AnnotationFailurePolicy,
    max_document_chars: usize,
}

impl ContextualAnnotator {
    /// Create an annotator backed by `llm`
    pub fn new(llm: Arc<dyn LlmProvider>, config: &AnnotationConfig) -> Self {
        Self {
            llm,
            policy: config.failure_policy,
            max_document_chars: config.max_document_chars,
        }
    }

    /// Annotate one chunk. An empty model reply is an error.
    pub async fn annotate(&self, chunk: Chunk, document_text: &str) -> Result<EnrichedChunk> {
        let document = truncate_chars(document_text, self.max_document_chars);
        let prompt = PromptBuilder::build_chunk_context_prompt(document, &chunk.text);

        let chunk_id = chunk.id;
        let context = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|e| Error::annotation(chunk_id, e.to_string()))?;

        EnrichedChunk::new(chunk, context)
            .ok_or_else(|| Error::annotation(chunk_id, "model returned an empty description"))
    }

    /// Annotate every chunk of `doc`, applying the configured failure policy
    pub async fn annotate_document(
        &self,
        doc: &Document,
        chunks: Vec<Chunk>,
    ) -> Result<AnnotatedChunks> {
        let document_text = doc.full_text();
        let total = chunks.len();
        let mut annotated = AnnotatedChunks::default();

        for chunk in chunks {
            match self.annotate(chunk, &document_text).await {
                Ok(enriched) => annotated.chunks.push(enriched),
                Err(e) => match self.policy {
                    AnnotationFailurePolicy::FailBuild => return Err(e),
                    AnnotationFailurePolicy::SkipChunk => {
                        tracing::warn!("Skipping chunk of {}: {}", doc.filename, e);
                        annotated.skipped += 1;
                    }
                },
            }
        }

        tracing::info!(
            "Annotated {}/{} chunks of {}",
            annotated.chunks.len(),
            total,
            doc.filename
        );

        Ok(annotated)
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
