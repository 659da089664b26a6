//! Answer generation with LLM and citation handling

pub mod answer;
pub mod citation;
pub mod prompt;

pub use answer::AnswerGenerator;
pub use citation::{quote_is_verbatim, resolve_citations, QuotedCitations};
pub use prompt::PromptBuilder;
