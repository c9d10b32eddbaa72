//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;

use clipvault_core::Config;
use clipvault_processing::{
    FfmpegExtractor, ThumbnailExtractor, UploadOrchestrator, UploadOrchestratorConfig,
};
use clipvault_sessions::{SessionReaper, SessionReaperConfig, UploadSessionRegistry};
use clipvault_storage::{LocalStorage, Storage};

use crate::state::AppState;

/// Initialize the entire application. The returned reaper handle must be
/// kept alive for the lifetime of the server and shut down after it exits.
pub async fn initialize_app(
    config: Config,
) -> Result<(Arc<AppState>, axum::Router, SessionReaper)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    telemetry::init_telemetry();

    tracing::info!("Configuration loaded and validated successfully");

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(config.storage_root.clone(), config.storage_base_url.clone())
            .await
            .context("Failed to initialize local storage")?,
    );

    let registry = Arc::new(UploadSessionRegistry::new(
        storage.clone(),
        config.max_concurrent_uploads,
    ));

    let extractor: Arc<dyn ThumbnailExtractor> =
        Arc::new(FfmpegExtractor::new(config.ffmpeg_path.clone()).context("Invalid FFMPEG_PATH")?);

    let orchestrator = Arc::new(UploadOrchestrator::new(
        registry.clone(),
        storage.clone(),
        extractor,
        UploadOrchestratorConfig {
            max_size_bytes: config.max_video_size_bytes,
            allowed_mime_prefixes: config.video_allowed_mime_prefixes.clone(),
            thumbnail_offset_secs: config.thumbnail_offset_secs,
        },
    ));

    let reaper = SessionReaper::spawn(
        registry.clone(),
        SessionReaperConfig {
            reap_interval_secs: config.stale_upload_reap_interval_secs,
            stale_age_secs: config.stale_upload_age_secs,
            retention_secs: config.session_retention_secs,
        },
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        storage,
        registry,
        orchestrator,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router, reaper))
}
