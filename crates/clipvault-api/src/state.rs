//! Shared application state for HTTP handlers.

use std::sync::Arc;

use clipvault_core::Config;
use clipvault_processing::UploadOrchestrator;
use clipvault_sessions::UploadSessionRegistry;
use clipvault_storage::Storage;

/// Application state shared across all routes
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub registry: Arc<UploadSessionRegistry>,
    pub orchestrator: Arc<UploadOrchestrator>,
}
