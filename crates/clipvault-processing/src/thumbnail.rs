//! Thumbnail extraction via an ffmpeg child process.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Thumbnail extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Invalid ffmpeg path: contains shell metacharacters")]
    InvalidFfmpegPath,

    #[error("Failed to execute ffmpeg: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg thumbnail extraction failed: {0}")]
    Ffmpeg(String),
}

/// Captures one representative frame from a video file.
///
/// Failure is non-fatal to an upload: the orchestrator stores the video
/// without a thumbnail and logs a warning. The direct thumbnail endpoint
/// surfaces the failure instead.
#[async_trait]
pub trait ThumbnailExtractor: Send + Sync {
    /// Extract a single frame at `offset_secs` from `input` into a JPEG at
    /// `output`.
    async fn extract(
        &self,
        input: &Path,
        output: &Path,
        offset_secs: f64,
    ) -> Result<(), ExtractionError>;
}

/// [`ThumbnailExtractor`] backed by the ffmpeg binary.
pub struct FfmpegExtractor {
    ffmpeg_path: String,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg_path: String) -> Result<Self, ExtractionError> {
        // Validate ffmpeg_path
        let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
        if ffmpeg_path.chars().any(|c| dangerous_chars.contains(&c)) {
            return Err(ExtractionError::InvalidFfmpegPath);
        }

        Ok(Self { ffmpeg_path })
    }
}

#[async_trait]
impl ThumbnailExtractor for FfmpegExtractor {
    async fn extract(
        &self,
        input: &Path,
        output: &Path,
        offset_secs: f64,
    ) -> Result<(), ExtractionError> {
        let args = vec![
            "-ss".to_string(),
            offset_secs.to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];

        let cmd_output = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !cmd_output.status.success() {
            let stderr = String::from_utf8_lossy(&cmd_output.stderr);
            return Err(ExtractionError::Ffmpeg(stderr.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_plain_path() {
        assert!(FfmpegExtractor::new("ffmpeg".to_string()).is_ok());
        assert!(FfmpegExtractor::new("/usr/local/bin/ffmpeg".to_string()).is_ok());
    }

    #[test]
    fn test_new_rejects_shell_metacharacters() {
        for path in ["ffmpeg; rm -rf /", "ffmpeg|cat", "$(ffmpeg)", "ffmpeg`id`"] {
            assert!(matches!(
                FfmpegExtractor::new(path.to_string()),
                Err(ExtractionError::InvalidFfmpegPath)
            ));
        }
    }

    #[tokio::test]
    async fn test_extract_fails_when_binary_missing() {
        let extractor = FfmpegExtractor::new("/nonexistent/ffmpeg-binary".to_string()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        let output = dir.path().join("thumbnail.jpg");
        std::fs::write(&input, b"not a video").unwrap();

        let result = extractor.extract(&input, &output, 1.0).await;
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }
}
