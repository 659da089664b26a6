//! End-to-end pipeline tests over fake model providers

mod common;

use common::*;
use contextual_rag::config::AnnotationFailurePolicy;
use contextual_rag::storage::SqliteVectorStore;
use contextual_rag::types::response::NOT_FOUND_ANSWER;
use contextual_rag::{AnswerMode, Error, GeneratedAnswer, QueryRequest};

const QUESTION: &str = "What is the capital of France?";

async fn indexed_harness() -> Harness {
    let h = harness(test_config()).await;
    h.pipeline
        .index_uploads(vec![upload("europe.pdf", &[FRANCE, GERMANY])])
        .await
        .unwrap();
    h.llm.reset();
    h.embedder.reset();
    h
}

#[tokio::test]
async fn test_index_report() {
    let h = harness(test_config()).await;
    let report = h
        .pipeline
        .index_uploads(vec![upload("europe.pdf", &[FRANCE, GERMANY])])
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].filename, "europe.pdf");
    assert_eq!(report.documents[0].total_pages, 2);
    assert_eq!(report.documents[0].total_chunks, 2);
    assert_eq!(report.chunks_indexed, 2);
    assert_eq!(report.chunks_skipped, 0);

    // One annotation call per chunk
    assert_eq!(h.llm.calls(), 2);
    assert_eq!(h.store.len_blocking().unwrap(), 2);
    assert!(h.pipeline.is_indexed().await.unwrap());
}

#[tokio::test]
async fn test_answer_only() {
    let h = indexed_harness().await;
    let response = h
        .pipeline
        .query(&QueryRequest::new(QUESTION).with_mode(AnswerMode::AnswerOnly))
        .await
        .unwrap();

    assert_eq!(response.answer(), ANSWER);
    assert!(matches!(response.result, GeneratedAnswer::AnswerOnly { .. }));
    assert_eq!(response.chunks_retrieved, 2);
    assert_eq!(h.llm.calls(), 1);
    assert_eq!(h.llm.structured_calls(), 0);
}

#[tokio::test]
async fn test_answer_with_sources_is_ranked() {
    let h = indexed_harness().await;
    let response = h
        .pipeline
        .query(
            &QueryRequest::new(QUESTION)
                .with_mode(AnswerMode::AnswerWithSources)
                .with_top_k(2),
        )
        .await
        .unwrap();

    let sources = response.result.sources().unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources.windows(2).all(|w| w[0].score >= w[1].score));

    let best = &sources[0];
    assert_eq!(best.title, "europe.pdf");
    assert_eq!(best.page, 1);
    assert!(best.content.starts_with(ANNOTATION));
    assert!(best.content.ends_with(FRANCE));
}

#[tokio::test]
async fn test_answer_with_citations_drops_fabrications() {
    let h = indexed_harness().await;
    let response = h
        .pipeline
        .query(
            &QueryRequest::new(QUESTION)
                .with_mode(AnswerMode::AnswerWithCitations)
                .with_top_k(1),
        )
        .await
        .unwrap();

    assert_eq!(response.answer(), ANSWER);
    assert_eq!(h.llm.calls(), 1);
    assert_eq!(h.llm.structured_calls(), 1);

    let citations = response.result.citations().unwrap();
    assert_eq!(citations.len(), 1, "fabricated citation must be dropped");

    let citation = &citations[0];
    // Metadata comes from the stored chunk, not the model reply
    assert_eq!(citation.title, "europe.pdf");
    assert_eq!(citation.source, "europe.pdf");
    assert_eq!(citation.page, 1);
    assert_eq!(citation.quote, FRANCE);
    assert!(citation.quote_verified);
}

#[tokio::test]
async fn test_default_mode_comes_from_config() {
    let mut config = test_config();
    config.retrieval.default_mode = AnswerMode::AnswerWithSources;
    let h = harness(config).await;
    h.pipeline
        .index_uploads(vec![upload("france.pdf", &[FRANCE])])
        .await
        .unwrap();

    let response = h.pipeline.query(&QueryRequest::new(QUESTION)).await.unwrap();
    assert_eq!(response.result.mode(), AnswerMode::AnswerWithSources);
}

#[tokio::test]
async fn test_zero_k_calls_no_provider() {
    let h = indexed_harness().await;

    for mode in [
        AnswerMode::AnswerOnly,
        AnswerMode::AnswerWithSources,
        AnswerMode::AnswerWithCitations,
    ] {
        let response = h
            .pipeline
            .query(&QueryRequest::new(QUESTION).with_top_k(0).with_mode(mode))
            .await
            .unwrap();
        assert_eq!(response.chunks_retrieved, 0);
        assert_eq!(response.answer(), NOT_FOUND_ANSWER);
        assert_eq!(response.result.mode(), mode);
    }

    assert_eq!(h.llm.calls(), 0);
    assert_eq!(h.llm.structured_calls(), 0);
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn test_empty_index_answers_not_found() {
    let h = harness(test_config()).await;
    let response = h
        .pipeline
        .query(&QueryRequest::new(QUESTION).with_mode(AnswerMode::AnswerWithCitations))
        .await
        .unwrap();

    assert_eq!(response.answer(), NOT_FOUND_ANSWER);
    assert_eq!(response.result.citations().unwrap().len(), 0);
    assert_eq!(h.llm.calls(), 0);
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn test_top_k_is_clamped() {
    let mut config = test_config();
    config.retrieval.max_top_k = 1;
    let h = harness(config).await;
    h.pipeline
        .index_uploads(vec![upload("europe.pdf", &[FRANCE, GERMANY])])
        .await
        .unwrap();

    let response = h
        .pipeline
        .query(&QueryRequest::new(QUESTION).with_top_k(50))
        .await
        .unwrap();
    assert_eq!(response.chunks_retrieved, 1);
}

#[tokio::test]
async fn test_empty_question_is_rejected() {
    let h = indexed_harness().await;
    let err = h.pipeline.query(&QueryRequest::new("   ")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn test_rebuild_replaces_previous_index() {
    let h = indexed_harness().await;

    let report = h
        .pipeline
        .index_uploads(vec![upload("germany.pdf", &[GERMANY])])
        .await
        .unwrap();
    assert_eq!(report.chunks_indexed, 1);

    let documents = h.pipeline.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].filename, "germany.pdf");
    assert_eq!(h.store.len_blocking().unwrap(), 1);

    let response = h
        .pipeline
        .query(&QueryRequest::new(QUESTION).with_mode(AnswerMode::AnswerWithSources))
        .await
        .unwrap();
    let sources = response.result.sources().unwrap();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].content.contains("Berlin"));
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let h = harness(test_config()).await;
    let first = h
        .pipeline
        .index_uploads(vec![upload("europe.pdf", &[FRANCE, GERMANY])])
        .await
        .unwrap();
    let second = h
        .pipeline
        .index_uploads(vec![upload("europe.pdf", &[FRANCE, GERMANY])])
        .await
        .unwrap();

    assert_eq!(first.documents[0].id, second.documents[0].id);
    assert_eq!(first.chunks_indexed, second.chunks_indexed);
    assert_eq!(h.store.len_blocking().unwrap(), 2);
    assert_eq!(h.pipeline.documents().len(), 1);
}

#[tokio::test]
async fn test_duplicate_uploads_are_indexed_once() {
    let h = harness(test_config()).await;
    let report = h
        .pipeline
        .index_uploads(vec![
            upload("france.pdf", &[FRANCE]),
            upload("france-copy.pdf", &[FRANCE]),
        ])
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.chunks_indexed, 1);
}

#[tokio::test]
async fn test_failed_annotation_keeps_previous_index() {
    let h = indexed_harness().await;
    h.llm.fail_annotation_on(Some(""));

    let err = h
        .pipeline
        .index_uploads(vec![upload("germany.pdf", &[GERMANY])])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Annotation { .. }));

    let documents = h.pipeline.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].filename, "europe.pdf");
    assert_eq!(h.store.len_blocking().unwrap(), 2);
}

#[tokio::test]
async fn test_empty_annotation_is_a_failure() {
    let h = harness(test_config()).await;
    h.llm.return_empty_annotations(true);

    let err = h
        .pipeline
        .index_uploads(vec![upload("france.pdf", &[FRANCE])])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Annotation { .. }));
    assert!(!h.pipeline.is_indexed().await.unwrap());
}

#[tokio::test]
async fn test_skip_policy_drops_failed_chunks() {
    let mut config = test_config();
    config.annotation.failure_policy = AnnotationFailurePolicy::SkipChunk;
    let h = harness(config).await;
    h.llm.fail_annotation_on(Some("Berlin"));

    let report = h
        .pipeline
        .index_uploads(vec![upload("europe.pdf", &[FRANCE, GERMANY])])
        .await
        .unwrap();

    assert_eq!(report.chunks_indexed, 1);
    assert_eq!(report.chunks_skipped, 1);
    assert_eq!(report.documents[0].total_chunks, 1);
    assert_eq!(h.store.len_blocking().unwrap(), 1);
}

#[tokio::test]
async fn test_skip_policy_fails_when_every_chunk_fails() {
    let mut config = test_config();
    config.annotation.failure_policy = AnnotationFailurePolicy::SkipChunk;
    let h = harness(config).await;
    h.pipeline
        .index_uploads(vec![upload("europe.pdf", &[FRANCE, GERMANY])])
        .await
        .unwrap();

    h.llm.fail_annotation_on(Some(""));
    let err = h
        .pipeline
        .index_uploads(vec![upload("germany.pdf", &[GERMANY])])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Llm(_)));

    let documents = h.pipeline.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].filename, "europe.pdf");
    assert_eq!(h.store.len_blocking().unwrap(), 2);
    assert!(h.pipeline.is_indexed().await.unwrap());
}

#[tokio::test]
async fn test_llm_failure_surfaces_as_llm_error() {
    let h = indexed_harness().await;
    h.llm.fail_answers(true);

    let err = h.pipeline.query(&QueryRequest::new(QUESTION)).await.unwrap_err();
    assert!(matches!(err, Error::Llm(_)));
    assert!(err.is_upstream());
}

#[tokio::test]
async fn test_malformed_pdf_keeps_previous_index() {
    let h = indexed_harness().await;

    let err = h
        .pipeline
        .index_uploads(vec![(
            "broken.pdf".to_string(),
            bytes::Bytes::from_static(b"%PDF-1.5 this is not really a pdf"),
        )])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FileParse { .. }));

    assert_eq!(h.pipeline.documents()[0].filename, "europe.pdf");
    assert_eq!(h.store.len_blocking().unwrap(), 2);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn test_non_pdf_upload_is_rejected() {
    let h = harness(test_config()).await;
    let err = h
        .pipeline
        .index_uploads(vec![(
            "notes.txt".to_string(),
            bytes::Bytes::from_static(b"The capital of France is Paris."),
        )])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFileType(_)));
}

#[tokio::test]
async fn test_no_documents_is_invalid() {
    let h = harness(test_config()).await;
    let err = h.pipeline.index_documents(Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn test_index_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("france.pdf");
    std::fs::write(&path, pdf_with_pages(&[FRANCE])).unwrap();

    let h = harness(test_config()).await;
    let report = h.pipeline.index_paths(&[path.clone()]).await.unwrap();

    assert_eq!(report.documents[0].filename, "france.pdf");
    assert_eq!(report.documents[0].source, path.display().to_string());
}

#[tokio::test]
async fn test_index_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db").join("vectors.sqlite3");

    {
        let store = SqliteVectorStore::open(&db, "persisted").unwrap();
        let h = harness_with_store(test_config(), store).await;
        h.pipeline
            .index_uploads(vec![upload("europe.pdf", &[FRANCE, GERMANY])])
            .await
            .unwrap();
    }

    let store = SqliteVectorStore::open(&db, "persisted").unwrap();
    let h = harness_with_store(test_config(), store).await;

    let documents = h.pipeline.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].total_chunks, 2);

    let response = h
        .pipeline
        .query(&QueryRequest::new(QUESTION).with_mode(AnswerMode::AnswerWithSources))
        .await
        .unwrap();
    assert_eq!(response.result.sources().unwrap()[0].page, 1);
    assert_eq!(h.llm.calls(), 1, "restart must not re-annotate");
}

#[tokio::test]
async fn test_health_report() {
    let h = harness(test_config()).await;
    assert!(h.pipeline.health().await.all_healthy());

    h.llm.set_healthy(false);
    let report = h.pipeline.health().await;
    assert!(!report.llm);
    assert!(report.embeddings);
    assert!(report.vector_store);
    assert!(!report.all_healthy());
}
