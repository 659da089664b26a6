//! Prompt templates for contextual annotation and RAG generation

use serde_json::{json, Value};

use crate::types::RetrievedChunk;

/// Name under which the citations schema is registered with the model
pub const CITATIONS_SCHEMA_NAME: &str = "quoted_citations";

/// Prompt builder for annotation and RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Prompt asking for a short description of where a chunk sits in its document
    pub fn build_chunk_context_prompt(document: &str, chunk: &str) -> String {
        format!(
            r#"You are an AI assistant specializing in research/document analysis.
Your task is to provide brief, relevant context for a chunk of text
based on the full document.

Here is the full document:
<paper>
{document}
</paper>

Here is the chunk:
<chunk>
{chunk}
</chunk>

In 2-3 sentences, explain:
- Where this chunk fits conceptually in the document (e.g., intro, methods, results, summary)
- The main topic or idea of this chunk
- How it relates to the overall document

Keep it concise, helpful, and neutral in tone.

Context:"#,
            document = document,
            chunk = chunk,
        )
    }

    /// Question-answering prompt grounded in the retrieved context
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are an assistant who is an expert in question-answering tasks.
Answer the following question using only the retrieved context.
If the answer is not in the context, say that you don't know.
Keep the answer detailed and well formatted.

Question:
{question}

Context:
{context}

Answer:"#,
            question = question,
            context = context,
        )
    }

    /// Prompt asking the model to quote the context articles that justify an answer
    pub fn build_citations_prompt(question: &str, context: &str, answer: &str) -> String {
        format!(
            r#"You are an assistant who is an expert in analyzing answers to questions
and finding referenced citations from context articles.

Given the question, the context articles, and the generated answer,
analyze the answer and quote citations from the context articles
that justify the answer.

Question:
{question}

Context Articles:
{context}

Answer:
{answer}"#,
            question = question,
            context = context,
            answer = answer,
        )
    }

    /// Join enriched chunk contents with blank lines
    pub fn format_docs(chunks: &[RetrievedChunk]) -> String {
        chunks
            .iter()
            .map(|r| r.chunk.content())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Prefix every chunk with its metadata so the model can reference it by ID
    pub fn format_docs_with_metadata(chunks: &[RetrievedChunk]) -> String {
        chunks
            .iter()
            .map(|r| {
                let source = r.chunk.source();
                format!(
                    "Context Article ID: {}\nContext Article Source: {}\nContext Article Title: {}\nContext Article Page: {}\n\nContent:\n{}\n",
                    r.chunk.id(),
                    source.source,
                    source.filename,
                    source.page_number,
                    r.chunk.content()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    /// JSON schema for the structured citations reply
    pub fn citations_schema() -> Value {
        json!({
            "type": "object",
            "description": "Quote citations from given context articles that can be used to justify the generated answer. Can be multiple articles.",
            "properties": {
                "citations": {
                    "type": "array",
                    "description": "Citations (can be multiple) from the context articles that justify the answer.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "string",
                                "description": "The string ID of a specific context article which justifies the answer."
                            },
                            "source": {
                                "type": "string",
                                "description": "The source/path of the specific context article which justifies the answer."
                            },
                            "title": {
                                "type": "string",
                                "description": "The title of the specific context article which justifies the answer."
                            },
                            "page": {
                                "type": "integer",
                                "description": "The page number of the specific context article which justifies the answer."
                            },
                            "quotes": {
                                "type": "string",
                                "description": "The verbatim sentences from the context article that are used to generate the answer."
                            }
                        },
                        "required": ["id", "source", "title", "page", "quotes"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["citations"],
            "additionalProperties": false
        })
    }
}
