//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p clipvault-api --test videos_test`
//! or `cargo test -p clipvault-api`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::path::Path;
use std::sync::Arc;

use clipvault_api::setup::routes;
use clipvault_api::state::AppState;
use clipvault_core::Config;
use clipvault_processing::{
    ExtractionError, ThumbnailExtractor, UploadOrchestrator, UploadOrchestratorConfig,
};
use clipvault_sessions::UploadSessionRegistry;
use clipvault_storage::{MemoryStorage, Storage};

/// Bytes the stub extractor writes in place of a real frame grab.
pub const STUB_JPEG: &[u8] = b"stub-jpeg-bytes";

/// Extractor that writes a fixed JPEG without running ffmpeg.
pub struct StubExtractor;

#[async_trait]
impl ThumbnailExtractor for StubExtractor {
    async fn extract(
        &self,
        _input: &Path,
        output: &Path,
        _offset_secs: f64,
    ) -> Result<(), ExtractionError> {
        tokio::fs::write(output, STUB_JPEG).await?;
        Ok(())
    }
}

/// Extractor that always fails, like ffmpeg on undecodable input.
pub struct FailingExtractor;

#[async_trait]
impl ThumbnailExtractor for FailingExtractor {
    async fn extract(
        &self,
        _input: &Path,
        _output: &Path,
        _offset_secs: f64,
    ) -> Result<(), ExtractionError> {
        Err(ExtractionError::Ffmpeg(
            "no decodable video stream".to_string(),
        ))
    }
}

fn test_config(max_video_size_bytes: u64) -> Config {
    Config {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        storage_root: "unused-in-tests".to_string(),
        storage_base_url: "https://example.com/files".to_string(),
        max_video_size_bytes,
        video_allowed_mime_prefixes: vec!["video/".to_string()],
        max_concurrent_uploads: 4,
        ffmpeg_path: "ffmpeg".to_string(),
        thumbnail_offset_secs: 1.0,
        stale_upload_reap_interval_secs: 0,
        stale_upload_age_secs: 900,
        session_retention_secs: 300,
    }
}

/// Test application: in-memory server over in-memory storage.
pub struct TestApp {
    pub server: TestServer,
    pub storage: MemoryStorage,
    pub registry: Arc<UploadSessionRegistry>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Setup test app with a stub extractor that always succeeds.
pub fn setup_test_app() -> TestApp {
    build_test_app(test_config(8 * 1024 * 1024), Arc::new(StubExtractor))
}

/// Setup test app with the given extractor.
pub fn setup_test_app_with(extractor: Arc<dyn ThumbnailExtractor>) -> TestApp {
    build_test_app(test_config(8 * 1024 * 1024), extractor)
}

/// Setup test app with a small size ceiling.
pub fn setup_test_app_with_ceiling(max_video_size_bytes: u64) -> TestApp {
    build_test_app(test_config(max_video_size_bytes), Arc::new(StubExtractor))
}

fn build_test_app(config: Config, extractor: Arc<dyn ThumbnailExtractor>) -> TestApp {
    let storage = MemoryStorage::new();
    let storage_dyn: Arc<dyn Storage> = Arc::new(storage.clone());

    let registry = Arc::new(UploadSessionRegistry::new(
        storage_dyn.clone(),
        config.max_concurrent_uploads,
    ));

    let orchestrator = Arc::new(UploadOrchestrator::new(
        registry.clone(),
        storage_dyn.clone(),
        extractor,
        UploadOrchestratorConfig {
            max_size_bytes: config.max_video_size_bytes,
            allowed_mime_prefixes: config.video_allowed_mime_prefixes.clone(),
            thumbnail_offset_secs: config.thumbnail_offset_secs,
        },
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        storage: storage_dyn,
        registry: registry.clone(),
        orchestrator,
    });

    let router = routes::setup_routes(&config, state).expect("router setup");
    let server = TestServer::new(router).expect("test server");

    TestApp {
        server,
        storage,
        registry,
    }
}
