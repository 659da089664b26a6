//! Document listing endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::state::AppState;
use crate::types::DocumentSummary;

/// Indexed documents
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
}

/// GET /api/documents - List indexed documents
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    let documents = state.pipeline().documents();
    Json(DocumentListResponse {
        total: documents.len(),
        documents,
    })
}
