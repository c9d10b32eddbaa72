//! Video upload session handlers: streamed upload, cancel, progress, list.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap},
    Json,
};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use clipvault_core::{AppError, SessionSnapshot};
use clipvault_processing::{ByteStream, UploadOutcome};

use crate::auth::OwnerId;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub session_id: Uuid,
    pub asset_path: String,
    pub asset_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,
    pub size_bytes: u64,
    pub mime_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub session_id: Uuid,
    pub cancelled: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadSessionList {
    pub sessions: Vec<SessionSnapshot>,
}

#[utoipa::path(
    post,
    path = "/api/v0/videos/upload",
    tag = "videos",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video uploaded and processed", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "Upload exceeded the size ceiling", body = ErrorResponse),
        (status = 499, description = "Upload cancelled by its owner", body = ErrorResponse),
        (status = 503, description = "Too many concurrent uploads", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    // Content-Length covers the whole multipart body, so it slightly
    // overstates the file size. The declared size is advisory; the hard
    // ceiling is enforced against bytes actually received.
    let declared_size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(state.config.max_video_size_bytes);

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
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AppError::InvalidInput("File part must declare a content type".to_string())
            })?;

        let stream: ByteStream<'_> =
            Box::pin(field.map(|chunk| chunk.map_err(std::io::Error::other)));

        let outcome = state
            .orchestrator
            .start_upload(&owner.0, &content_type, declared_size, stream)
            .await?;

        return match outcome {
            UploadOutcome::Completed { session_id, asset } => Ok(Json(UploadResponse {
                session_id,
                asset_path: asset.path,
                asset_url: asset.url,
                thumbnail_path: asset.thumbnail_path,
                size_bytes: asset.size_bytes,
                mime_type: asset.mime_type,
            })),
            UploadOutcome::Cancelled { session_id } => Err(HttpAppError(AppError::Cancelled(
                format!("Upload session {} was cancelled", session_id),
            ))),
        };
    }

    Err(HttpAppError(AppError::InvalidInput(
        "No file provided".to_string(),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v0/videos/upload/{session_id}",
    tag = "videos",
    params(
        ("session_id" = Uuid, Path, description = "Upload session ID")
    ),
    responses(
        (status = 200, description = "Cancellation requested (idempotent)", body = CancelResponse),
        (status = 403, description = "Session belongs to another owner", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
pub async fn cancel_upload(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, HttpAppError> {
    state.orchestrator.cancel_upload(session_id, &owner.0).await?;
    Ok(Json(CancelResponse {
        session_id,
        cancelled: true,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v0/videos/upload/{session_id}",
    tag = "videos",
    params(
        ("session_id" = Uuid, Path, description = "Upload session ID")
    ),
    responses(
        (status = 200, description = "Session progress snapshot", body = SessionSnapshot),
        (status = 403, description = "Session belongs to another owner", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
pub async fn get_upload_progress(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, HttpAppError> {
    let snapshot = state.registry.get_for_owner(session_id, &owner.0).await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    get,
    path = "/api/v0/videos/upload",
    tag = "videos",
    responses(
        (status = 200, description = "Caller's sessions, newest first", body = UploadSessionList)
    )
)]
pub async fn list_uploads(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
) -> Result<Json<UploadSessionList>, HttpAppError> {
    let sessions = state.registry.list_for_owner(&owner.0).await;
    Ok(Json(UploadSessionList { sessions }))
}
