//! Configuration module
//!
//! This module provides configuration for the upload service: HTTP server
//! settings, storage layout, upload limits, and thumbnail extraction knobs.
//! All values come from environment variables with development defaults.

use std::env;

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_VIDEO_SIZE_MB: u64 = 500;
const MAX_CONCURRENT_UPLOADS: usize = 8;
const THUMBNAIL_OFFSET_SECS: f64 = 1.0;
const STALE_UPLOAD_REAP_INTERVAL_SECS: u64 = 60;
const STALE_UPLOAD_AGE_SECS: i64 = 900;
const SESSION_RETENTION_SECS: i64 = 300;

/// Application configuration for the upload service.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    // Storage configuration
    pub storage_root: String,
    pub storage_base_url: String,
    // Upload limits
    pub max_video_size_bytes: u64,
    pub video_allowed_mime_prefixes: Vec<String>,
    pub max_concurrent_uploads: usize,
    // Thumbnail extraction
    pub ffmpeg_path: String,
    pub thumbnail_offset_secs: f64,
    /// Interval in seconds between runs of the stale session reaper. 0 = disabled.
    pub stale_upload_reap_interval_secs: u64,
    /// Age in seconds after which a non-terminal session is considered abandoned.
    pub stale_upload_age_secs: i64,
    /// Retention in seconds for terminal sessions before the reaper removes them.
    /// Keeps duplicate cancel requests idempotent for the grace period.
    pub session_retention_secs: i64,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase().eq("production")
            || self.environment.to_lowercase().eq("prod")
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "data/uploads".to_string()),
            storage_base_url: env::var("STORAGE_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/files", SERVER_PORT)),
            max_video_size_bytes: env::var("MAX_VIDEO_SIZE_MB")
                .unwrap_or_else(|_| MAX_VIDEO_SIZE_MB.to_string())
                .parse::<u64>()
                .unwrap_or(MAX_VIDEO_SIZE_MB)
                * 1024
                * 1024,
            video_allowed_mime_prefixes: env::var("VIDEO_ALLOWED_MIME_PREFIXES")
                .unwrap_or_else(|_| "video/".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            max_concurrent_uploads: env::var("MAX_CONCURRENT_UPLOADS")
                .unwrap_or_else(|_| MAX_CONCURRENT_UPLOADS.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_UPLOADS),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            thumbnail_offset_secs: env::var("THUMBNAIL_OFFSET_SECS")
                .unwrap_or_else(|_| THUMBNAIL_OFFSET_SECS.to_string())
                .parse()
                .unwrap_or(THUMBNAIL_OFFSET_SECS),
            stale_upload_reap_interval_secs: env::var("STALE_UPLOAD_REAP_INTERVAL_SECS")
                .unwrap_or_else(|_| STALE_UPLOAD_REAP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(STALE_UPLOAD_REAP_INTERVAL_SECS),
            stale_upload_age_secs: env::var("STALE_UPLOAD_AGE_SECS")
                .unwrap_or_else(|_| STALE_UPLOAD_AGE_SECS.to_string())
                .parse()
                .unwrap_or(STALE_UPLOAD_AGE_SECS),
            session_retention_secs: env::var("SESSION_RETENTION_SECS")
                .unwrap_or_else(|_| SESSION_RETENTION_SECS.to_string())
                .parse()
                .unwrap_or(SESSION_RETENTION_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_root.trim().is_empty() {
            return Err(anyhow::anyhow!("STORAGE_ROOT must not be empty"));
        }

        if self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_VIDEO_SIZE_MB must be greater than zero"
            ));
        }

        if self.max_concurrent_uploads == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_UPLOADS must be greater than zero"
            ));
        }

        if self.video_allowed_mime_prefixes.is_empty() {
            return Err(anyhow::anyhow!(
                "VIDEO_ALLOWED_MIME_PREFIXES must name at least one media type prefix"
            ));
        }

        if self.thumbnail_offset_secs < 0.0 {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_OFFSET_SECS must not be negative"
            ));
        }

        Ok(())
    }
}
