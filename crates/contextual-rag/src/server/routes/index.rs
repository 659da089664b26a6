//! Indexing endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::IndexReport;

/// POST /api/index - Upload PDFs and rebuild the index from them
///
/// Every file part of the multipart body is indexed; the previous index is
/// replaced only if all of them load and annotate successfully.
pub async fn index_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IndexReport>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            tracing::debug!("Ignoring non-file field {:?}", field.name());
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("Failed to read {}: {}", filename, e)))?;

        tracing::info!("Received file: {} ({} bytes)", filename, data.len());
        uploads.push((filename, data));
    }

    if uploads.is_empty() {
        return Err(Error::InvalidRequest("No files uploaded".to_string()));
    }

    let report = state.pipeline().index_uploads(uploads).await?;
    Ok(Json(report))
}
