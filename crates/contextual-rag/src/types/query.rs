//! Query request types

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Shape of the generated answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Free-text answer only
    #[default]
    AnswerOnly,
    /// Answer plus the retrieved chunks it was generated from
    AnswerWithSources,
    /// Answer plus structured citations resolved against the retrieved chunks
    AnswerWithCitations,
}

impl AnswerMode {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            AnswerMode::AnswerOnly => "Answer only",
            AnswerMode::AnswerWithSources => "Answer + sources",
            AnswerMode::AnswerWithCitations => "Answer + citations",
        }
    }
}

impl FromStr for AnswerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "answer_only" | "answer" | "plain" => Ok(AnswerMode::AnswerOnly),
            "answer_with_sources" | "sources" => Ok(AnswerMode::AnswerWithSources),
            "answer_with_citations" | "citations" => Ok(AnswerMode::AnswerWithCitations),
            other => Err(format!(
                "unknown answer mode '{}' (expected answer-only, sources, or citations)",
                other
            )),
        }
    }
}

impl std::fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Query request for RAG search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Number of chunks to retrieve (config default when absent)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Answer shape (config default when absent)
    #[serde(default)]
    pub mode: Option<AnswerMode>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Set the answer mode
    pub fn with_mode(mut self, mode: AnswerMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("answer-only".parse::<AnswerMode>().unwrap(), AnswerMode::AnswerOnly);
        assert_eq!("Sources".parse::<AnswerMode>().unwrap(), AnswerMode::AnswerWithSources);
        assert_eq!(
            "answer_with_citations".parse::<AnswerMode>().unwrap(),
            AnswerMode::AnswerWithCitations
        );
        assert!("summary".parse::<AnswerMode>().is_err());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"question": "What is the capital of France?"}"#).unwrap();
        assert_eq!(request.top_k, None);
        assert_eq!(request.mode, None);

        let request: QueryRequest = serde_json::from_str(
            r#"{"question": "q", "top_k": 3, "mode": "answer_with_sources"}"#,
        )
        .unwrap();
        assert_eq!(request.top_k, Some(3));
        assert_eq!(request.mode, Some(AnswerMode::AnswerWithSources));
    }
}
