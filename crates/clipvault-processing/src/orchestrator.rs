//! Upload orchestration: validate → stream to storage → thumbnail → complete.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use clipvault_core::{UploadStatus, VideoAsset};
use clipvault_sessions::{SessionError, UploadSessionRegistry};
use clipvault_storage::{keys, Storage};

use crate::thumbnail::{ExtractionError, ThumbnailExtractor};
use crate::validator::{UploadValidator, ValidationError};

/// Incoming upload body as a stream of chunks. The lifetime lets multipart
/// field streams, which borrow from their request body, flow in directly.
pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'a>>;

/// Upload pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] clipvault_storage::StorageError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Upload exceeded the size ceiling: {received} bytes (max: {max} bytes)")]
    CeilingExceeded { received: u64, max: u64 },

    #[error("Failed to read upload stream: {0}")]
    Stream(#[source] std::io::Error),
}

/// How a finished upload ended.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The stream was fully ingested and processed.
    Completed {
        session_id: Uuid,
        asset: VideoAsset,
    },
    /// Cancellation was observed before the stream finished; the partial
    /// file is already deleted.
    Cancelled { session_id: Uuid },
}

enum IngestEnd {
    Finished { size_bytes: u64 },
    Cancelled,
}

/// Config for the upload orchestrator (ceiling, MIME policy, thumbnails).
#[derive(Clone)]
pub struct UploadOrchestratorConfig {
    pub max_size_bytes: u64,
    pub allowed_mime_prefixes: Vec<String>,
    pub thumbnail_offset_secs: f64,
}

/// Drives a full upload: validation, session lifecycle, streamed storage
/// writes, cancellation, thumbnail extraction.
pub struct UploadOrchestrator {
    registry: Arc<UploadSessionRegistry>,
    storage: Arc<dyn Storage>,
    extractor: Arc<dyn ThumbnailExtractor>,
    validator: UploadValidator,
    config: UploadOrchestratorConfig,
}

impl UploadOrchestrator {
    pub fn new(
        registry: Arc<UploadSessionRegistry>,
        storage: Arc<dyn Storage>,
        extractor: Arc<dyn ThumbnailExtractor>,
        config: UploadOrchestratorConfig,
    ) -> Self {
        let validator =
            UploadValidator::new(config.max_size_bytes, config.allowed_mime_prefixes.clone());
        Self {
            registry,
            storage,
            extractor,
            validator,
            config,
        }
    }

    /// Run the full pipeline for one upload.
    ///
    /// Validation failures return before any session exists. After that the
    /// session always ends terminal: `completed` with a [`VideoAsset`],
    /// `cancelled` when the owner's cancel signal is observed at a chunk
    /// boundary, `failed` on any storage or stream error. The partial file
    /// is deleted before `cancelled` or `failed` is committed.
    pub async fn start_upload(
        &self,
        owner_id: &str,
        declared_mime: &str,
        declared_size: u64,
        stream: ByteStream<'_>,
    ) -> Result<UploadOutcome, UploadError> {
        self.validator.validate(declared_mime, declared_size)?;

        let destination_key = keys::video_key(Uuid::new_v4(), declared_mime);
        let session_id = self
            .registry
            .create(owner_id, &destination_key, declared_size)
            .await?;
        let cancel_token = self.registry.cancel_token(session_id).await?;

        tracing::info!(
            session_id = %session_id,
            owner_id = %owner_id,
            content_type = %declared_mime,
            "Starting streamed upload"
        );

        match self
            .ingest(session_id, &destination_key, &cancel_token, stream)
            .await
        {
            Ok(IngestEnd::Finished { size_bytes }) => {
                self.registry
                    .transition(session_id, UploadStatus::Processing)
                    .await?;

                let thumbnail_path = self.try_extract_thumbnail(session_id, &destination_key).await;

                self.registry
                    .transition(session_id, UploadStatus::Completed)
                    .await?;

                let asset = VideoAsset {
                    path: destination_key.clone(),
                    url: self.storage.url_for(&destination_key),
                    thumbnail_path,
                    size_bytes,
                    mime_type: declared_mime.to_string(),
                };

                tracing::info!(
                    session_id = %session_id,
                    path = %asset.path,
                    size_bytes = asset.size_bytes,
                    thumbnail = asset.has_thumbnail(),
                    "Upload completed"
                );

                Ok(UploadOutcome::Completed { session_id, asset })
            }
            Ok(IngestEnd::Cancelled) => {
                self.registry.finish_cancelled(session_id).await?;
                Ok(UploadOutcome::Cancelled { session_id })
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %err,
                    "Upload failed, finalizing session"
                );
                if let Err(cleanup_err) = self.registry.finish_failed(session_id).await {
                    tracing::error!(
                        session_id = %session_id,
                        error = %cleanup_err,
                        "Cleanup after failed upload also failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Request cancellation of an upload on behalf of its owner.
    ///
    /// Returns as soon as the signal is set; the streaming task observes it
    /// at its next chunk boundary and finalizes the session itself. A cancel
    /// for a session that already reached a terminal status is a no-op
    /// success.
    pub async fn cancel_upload(&self, session_id: Uuid, owner_id: &str) -> Result<(), UploadError> {
        self.registry.request_cancel(session_id, owner_id).await?;
        Ok(())
    }

    /// Extract a thumbnail for an already stored video and store it next to
    /// the video. Returns the thumbnail storage key.
    pub async fn extract_thumbnail(&self, video_key: &str) -> Result<String, UploadError> {
        let video_data = self.storage.read(video_key).await?;

        let temp_dir = TempDir::new().map_err(ExtractionError::from)?;
        let extension = video_key.rsplit_once('.').map(|(_, e)| e).unwrap_or("mp4");
        let input_path = temp_dir.path().join(format!("input.{}", extension));
        let output_path = temp_dir.path().join("thumbnail.jpg");

        tokio::fs::write(&input_path, &video_data)
            .await
            .map_err(ExtractionError::from)?;

        self.extractor
            .extract(&input_path, &output_path, self.config.thumbnail_offset_secs)
            .await?;

        let thumbnail_data = tokio::fs::read(&output_path)
            .await
            .map_err(ExtractionError::from)?;

        let thumbnail_key = keys::thumbnail_key(video_key);
        self.storage.put(&thumbnail_key, thumbnail_data).await?;

        Ok(thumbnail_key)
    }

    /// Stream the body into storage, observing the cancel signal at chunk
    /// boundaries. The writer is consumed on success and dropped on every
    /// other path, so the caller can delete the partial file afterwards.
    async fn ingest(
        &self,
        session_id: Uuid,
        destination_key: &str,
        cancel_token: &CancellationToken,
        mut stream: ByteStream<'_>,
    ) -> Result<IngestEnd, UploadError> {
        self.registry
            .transition(session_id, UploadStatus::Uploading)
            .await?;

        let mut writer = self.storage.create(destination_key).await?;
        let mut total_bytes: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    tracing::info!(
                        session_id = %session_id,
                        bytes_received = total_bytes,
                        "Cancellation observed at chunk boundary"
                    );
                    return Ok(IngestEnd::Cancelled);
                }

                next = stream.next() => {
                    match next {
                        Some(Ok(chunk)) => {
                            let received = total_bytes + chunk.len() as u64;
                            if received > self.config.max_size_bytes {
                                return Err(UploadError::CeilingExceeded {
                                    received,
                                    max: self.config.max_size_bytes,
                                });
                            }
                            let written = writer.write_chunk(&chunk).await?;
                            total_bytes += written as u64;
                            self.registry.advance(session_id, written as u64).await?;
                        }
                        Some(Err(e)) => {
                            return Err(UploadError::Stream(e));
                        }
                        None => {
                            let size_bytes = writer.finish().await?;
                            return Ok(IngestEnd::Finished { size_bytes });
                        }
                    }
                }
            }
        }
    }

    async fn try_extract_thumbnail(&self, session_id: Uuid, video_key: &str) -> Option<String> {
        match self.extract_thumbnail(video_key).await {
            Ok(thumbnail_key) => {
                tracing::info!(
                    session_id = %session_id,
                    thumbnail_path = %thumbnail_key,
                    "Thumbnail extracted"
                );
                Some(thumbnail_key)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    video_key = %video_key,
                    error = %e,
                    "Thumbnail extraction failed, storing video without thumbnail"
                );
                None
            }
        }
    }
}
