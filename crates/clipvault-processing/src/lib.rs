//! Upload processing: validation gate, streamed ingestion, thumbnail
//! extraction.
//!
//! The [`UploadOrchestrator`] drives a full upload from validation through
//! storage and thumbnail extraction, with cooperative cancellation observed
//! at chunk boundaries.

pub mod orchestrator;
pub mod thumbnail;
pub mod validator;

pub use orchestrator::{
    ByteStream, UploadError, UploadOrchestrator, UploadOrchestratorConfig, UploadOutcome,
};
pub use thumbnail::{ExtractionError, FfmpegExtractor, ThumbnailExtractor};
pub use validator::{UploadValidator, ValidationError};
