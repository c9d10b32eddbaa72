//! Direct thumbnail extraction handler.
//!
//! Stores the posted file and runs the frame extractor against the stored
//! copy, outside any upload session. Unlike the upload pipeline, extraction
//! failure here fails the request.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use clipvault_core::AppError;
use clipvault_storage::keys;

use crate::auth::OwnerId;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ThumbnailResponse {
    pub video_path: String,
    pub thumbnail_path: String,
    pub thumbnail_url: String,
}

/// Extract file data and content type from a multipart form with a single
/// "file" field. Buffers the file; thumbnail sources are small clips, not
/// the streamed upload path.
async fn extract_multipart_file(mut multipart: Multipart) -> Result<(Vec<u8>, String), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

        return Ok((data.to_vec(), content_type));
    }

    Err(AppError::InvalidInput("No file provided".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/v0/videos/thumbnail",
    tag = "videos",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Thumbnail extracted", body = ThumbnailResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 422, description = "Frame extraction failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_thumbnail(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    multipart: Multipart,
) -> Result<Json<ThumbnailResponse>, HttpAppError> {
    let (data, content_type) = extract_multipart_file(multipart).await?;
    if data.is_empty() {
        return Err(HttpAppError(AppError::InvalidInput(
            "File is empty".to_string(),
        )));
    }

    let video_key = keys::video_key(Uuid::new_v4(), &content_type);
    state.storage.put(&video_key, data).await.map_err(HttpAppError::from)?;

    tracing::info!(
        owner_id = %owner.0,
        video_key = %video_key,
        "Extracting thumbnail for directly posted file"
    );

    let thumbnail_path = state.orchestrator.extract_thumbnail(&video_key).await?;
    let thumbnail_url = state.storage.url_for(&thumbnail_path);

    Ok(Json(ThumbnailResponse {
        video_path: video_key,
        thumbnail_path,
        thumbnail_url,
    }))
}
