//! API routes for the RAG server

pub mod documents;
pub mod index;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Document listing
        .route("/documents", get(documents::list_documents))
        // Indexing - with larger body limit for file uploads
        .route(
            "/index",
            post(index::index_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Query
        .route("/query", post(query::query_rag))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    let (llm, embeddings, store) = state.pipeline().backend_names();

    Json(serde_json::json!({
        "name": "contextual-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Contextual RAG over PDF documents with grounded, citation-aware answers",
        "backends": {
            "llm": llm,
            "embeddings": embeddings,
            "vector_store": store,
        },
        "models": {
            "chat": config.llm.chat_model,
            "embeddings": config.embeddings.model,
        },
        "retrieval": {
            "default_top_k": config.retrieval.top_k,
            "max_top_k": config.retrieval.max_top_k,
            "default_mode": config.retrieval.default_mode,
        },
        "endpoints": {
            "POST /api/index": "Upload PDFs and rebuild the index from them",
            "POST /api/query": "Ask a question (modes: answer_only, answer_with_sources, answer_with_citations)",
            "GET /api/documents": "List indexed documents",
            "GET /api/info": "Service information"
        }
    }))
}
