//! Query endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Answer a question from the indexed documents
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let response = state.pipeline().query(&request).await?;

    tracing::info!(
        "Answered in {}ms from {} chunks",
        response.processing_time_ms,
        response.chunks_retrieved
    );

    Ok(Json(response))
}
