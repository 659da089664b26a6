//! Resolution of model-proposed citations against the retrieved chunks

use serde::Deserialize;
use uuid::Uuid;

use crate::types::{Citation, RetrievedChunk};

/// A citation as proposed by the model, before resolution
#[derive(Debug, Clone, Deserialize)]
pub struct ProposedCitation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub quotes: String,
}

/// Structured reply to the citations prompt
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotedCitations {
    #[serde(default)]
    pub citations: Vec<ProposedCitation>,
}

/// Collapse runs of whitespace so quotes survive reflowed text
fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `quote` appears in `content`, ignoring differences in whitespace
pub fn quote_is_verbatim(quote: &str, content: &str) -> bool {
    let quote = squash_whitespace(quote);
    !quote.is_empty() && squash_whitespace(content).contains(&quote)
}

/// Find the retrieved chunk a proposed citation refers to
///
/// The ID is authoritative. When it does not name a retrieved chunk, a
/// citation still resolves if exactly one retrieved chunk matches its
/// source (or title) and page.
fn find_chunk<'a>(
    proposed: &ProposedCitation,
    retrieved: &'a [RetrievedChunk],
) -> Option<&'a RetrievedChunk> {
    if let Ok(id) = Uuid::parse_str(proposed.id.trim()) {
        if let Some(found) = retrieved.iter().find(|r| r.chunk.id() == id) {
            return Some(found);
        }
    }

    let mut candidates = retrieved.iter().filter(|r| {
        let source = r.chunk.source();
        (source.source == proposed.source || source.filename == proposed.title)
            && i64::from(source.page_number) == proposed.page
    });

    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Resolve proposed citations against the retrieved set
///
/// Unresolvable citations are dropped. Source, title and page always come
/// from the stored chunk metadata, never from the model.
pub fn resolve_citations(
    proposed: &QuotedCitations,
    retrieved: &[RetrievedChunk],
) -> Vec<Citation> {
    let mut resolved: Vec<Citation> = Vec::new();

    for candidate in &proposed.citations {
        let Some(found) = find_chunk(candidate, retrieved) else {
            tracing::warn!(
                "Dropping citation that matches no retrieved chunk (id: {}, source: {}, page: {})",
                candidate.id,
                candidate.source,
                candidate.page
            );
            continue;
        };

        let source = found.chunk.source();
        let quote = candidate.quotes.trim().to_string();
        let quote_verified = quote_is_verbatim(&quote, &found.chunk.content());
        if !quote_verified {
            tracing::debug!("Quote for chunk {} not found verbatim", found.chunk.id());
        }

        let citation = Citation {
            id: found.chunk.id(),
            source: source.source.clone(),
            title: source.filename.clone(),
            page: source.page_number,
            quote,
            quote_verified,
        };

        if !resolved.contains(&citation) {
            resolved.push(citation);
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkSource, EnrichedChunk};

    fn retrieved(text: &str, page: u32, index: u32) -> RetrievedChunk {
        let source = ChunkSource {
            filename: "france.pdf".to_string(),
            source: "/docs/france.pdf".to_string(),
            page_number: page,
        };
        let chunk = Chunk::new(Uuid::nil(), text.to_string(), source, index, 0, text.len());
        RetrievedChunk {
            chunk: EnrichedChunk::new(chunk, "Geography overview.").unwrap(),
            score: 0.8,
        }
    }

    fn proposed(id: &str, source: &str, page: i64, quotes: &str) -> ProposedCitation {
        ProposedCitation {
            id: id.to_string(),
            source: source.to_string(),
            title: String::new(),
            page,
            quotes: quotes.to_string(),
        }
    }

    #[test]
    fn test_resolves_by_id_and_overrides_metadata() {
        let chunks = vec![retrieved("The capital of France is Paris.", 1, 0)];
        let reply = QuotedCitations {
            citations: vec![proposed(
                &chunks[0].chunk.id().to_string(),
                "made-up.pdf",
                42,
                "The capital of France is Paris.",
            )],
        };

        let citations = resolve_citations(&reply, &chunks);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].source, "/docs/france.pdf");
        assert_eq!(citations[0].title, "france.pdf");
        assert_eq!(citations[0].page, 1);
        assert!(citations[0].quote_verified);
    }

    #[test]
    fn test_drops_fabricated_citations() {
        let chunks = vec![retrieved("The capital of France is Paris.", 1, 0)];
        let reply = QuotedCitations {
            citations: vec![
                proposed(&Uuid::new_v4().to_string(), "other.pdf", 7, "Berlin."),
                proposed("not-a-uuid", "/docs/france.pdf", 9, "Paris."),
            ],
        };

        assert!(resolve_citations(&reply, &chunks).is_empty());
    }

    #[test]
    fn test_falls_back_to_unique_source_and_page() {
        let chunks = vec![
            retrieved("Paris is large.", 1, 0),
            retrieved("Lyon is smaller.", 2, 1),
            retrieved("Marseille is a port.", 2, 2),
        ];
        let reply = QuotedCitations {
            citations: vec![
                proposed("1", "/docs/france.pdf", 1, "Paris is large."),
                proposed("2", "/docs/france.pdf", 2, "Lyon is smaller."),
            ],
        };

        let citations = resolve_citations(&reply, &chunks);
        assert_eq!(citations.len(), 1, "ambiguous page 2 match must be dropped");
        assert_eq!(citations[0].id, chunks[0].chunk.id());
    }

    #[test]
    fn test_quote_verification_ignores_whitespace() {
        assert!(quote_is_verbatim("capital of\n France", "The capital of France is Paris."));
        assert!(!quote_is_verbatim("capital of Spain", "The capital of France is Paris."));
        assert!(!quote_is_verbatim("   ", "anything"));
    }

    #[test]
    fn test_deserializes_model_reply() {
        let reply: QuotedCitations = serde_json::from_str(
            r#"{"citations": [{"id": "x", "source": "s", "title": "t", "page": 2, "quotes": "q"}]}"#,
        )
        .unwrap();
        assert_eq!(reply.citations.len(), 1);
        assert_eq!(reply.citations[0].page, 2);
    }
}
