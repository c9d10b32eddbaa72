//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use clipvault_core::models;

/// Returns the OpenAPI spec served at /api/openapi.json.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clipvault API",
        version = "0.1.0",
        description = "Video upload session API (v0): streamed multipart ingestion with cooperative cancellation, progress tracking, and thumbnail extraction. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::video_upload::upload_video,
        handlers::video_upload::list_uploads,
        handlers::video_upload::get_upload_progress,
        handlers::video_upload::cancel_upload,
        handlers::thumbnail::create_thumbnail,
    ),
    components(schemas(
        models::SessionSnapshot,
        models::UploadStatus,
        models::VideoAsset,
        handlers::video_upload::UploadResponse,
        handlers::video_upload::CancelResponse,
        handlers::video_upload::UploadSessionList,
        handlers::thumbnail::ThumbnailResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "videos", description = "Video upload sessions and thumbnails")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_lists_upload_paths() {
        let spec = get_openapi_spec();
        let paths: Vec<&String> = spec.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/v0/videos/upload"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/v0/videos/upload/{session_id}"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/v0/videos/thumbnail"));
    }

    #[test]
    fn test_openapi_spec_serializes() {
        let spec = get_openapi_spec();
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["info"]["title"], "Clipvault API");
    }
}
