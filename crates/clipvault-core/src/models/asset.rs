use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stored video produced by a completed upload. Handed back to the caller;
/// the core keeps no record of it once the session is reaped.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VideoAsset {
    /// Storage key of the video file.
    pub path: String,
    /// Public URL of the video file.
    pub url: String,
    /// Storage key of the derived thumbnail, absent when extraction failed.
    pub thumbnail_path: Option<String>,
    pub size_bytes: u64,
    pub mime_type: String,
}

impl VideoAsset {
    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_asset_serialization() {
        let asset = VideoAsset {
            path: "videos/abc.mp4".to_string(),
            url: "http://localhost:4000/files/videos/abc.mp4".to_string(),
            thumbnail_path: Some("videos/abc.jpg".to_string()),
            size_bytes: 1024,
            mime_type: "video/mp4".to_string(),
        };

        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["path"], "videos/abc.mp4");
        assert_eq!(json["thumbnail_path"], "videos/abc.jpg");
        assert!(asset.has_thumbnail());
    }

    #[test]
    fn test_video_asset_without_thumbnail() {
        let asset = VideoAsset {
            path: "videos/abc.mp4".to_string(),
            url: "http://localhost:4000/files/videos/abc.mp4".to_string(),
            thumbnail_path: None,
            size_bytes: 0,
            mime_type: "video/mp4".to_string(),
        };

        assert!(!asset.has_thumbnail());
        let json = serde_json::to_value(&asset).unwrap();
        assert!(json["thumbnail_path"].is_null());
    }
}
