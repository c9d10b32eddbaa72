//! Shared key generation for stored videos and their thumbnails.
//!
//! Key format: `videos/{uuid}.{ext}` for the video, same stem with `.jpg`
//! for its thumbnail.

use uuid::Uuid;

/// Map a video MIME type to the file extension used in storage keys.
/// Unknown subtypes fall back to `bin` rather than trusting client input.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.to_lowercase().as_str() {
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/x-msvideo" => "avi",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "video/mpeg" => "mpg",
        "video/ogg" => "ogv",
        "video/3gpp" => "3gp",
        _ => "bin",
    }
}

/// Generate the storage key for an uploaded video.
pub fn video_key(id: Uuid, mime_type: &str) -> String {
    format!("videos/{}.{}", id, extension_for_mime(mime_type))
}

/// Generate the thumbnail key next to a video key: same stem, `.jpg`.
pub fn thumbnail_key(video_key: &str) -> String {
    match video_key.rsplit_once('.') {
        Some((stem, _)) => format!("{}.jpg", stem),
        None => format!("{}.jpg", video_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_key_uses_mime_extension() {
        let id = Uuid::new_v4();
        assert_eq!(video_key(id, "video/mp4"), format!("videos/{}.mp4", id));
        assert_eq!(video_key(id, "video/webm"), format!("videos/{}.webm", id));
        assert_eq!(
            video_key(id, "video/quicktime"),
            format!("videos/{}.mov", id)
        );
    }

    #[test]
    fn test_unknown_mime_falls_back_to_bin() {
        let id = Uuid::new_v4();
        assert_eq!(
            video_key(id, "video/x-mystery-codec"),
            format!("videos/{}.bin", id)
        );
    }

    #[test]
    fn test_mime_matching_is_case_insensitive() {
        assert_eq!(extension_for_mime("Video/MP4"), "mp4");
    }

    #[test]
    fn test_thumbnail_key_sits_next_to_video() {
        assert_eq!(thumbnail_key("videos/abc.mp4"), "videos/abc.jpg");
        assert_eq!(thumbnail_key("videos/abc.webm"), "videos/abc.jpg");
        assert_eq!(thumbnail_key("videos/no-extension"), "videos/no-extension.jpg");
    }
}
