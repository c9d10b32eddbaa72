//! Upload pipeline integration tests.
//!
//! Run with: `cargo test -p clipvault-processing --test uploads_test`

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use clipvault_core::UploadStatus;
use clipvault_processing::{
    ByteStream, ExtractionError, ThumbnailExtractor, UploadError, UploadOrchestrator,
    UploadOrchestratorConfig, UploadOutcome,
};
use clipvault_sessions::{SessionError, UploadSessionRegistry};
use clipvault_storage::{MemoryStorage, Storage, StorageError};

const MIB: usize = 1024 * 1024;

/// Writes a fixed marker instead of shelling out to ffmpeg.
struct StubExtractor;

#[async_trait]
impl ThumbnailExtractor for StubExtractor {
    async fn extract(
        &self,
        _input: &Path,
        output: &Path,
        _offset_secs: f64,
    ) -> Result<(), ExtractionError> {
        tokio::fs::write(output, b"stub-jpeg").await?;
        Ok(())
    }
}

/// Fails like ffmpeg does on a corrupt or empty input.
struct FailingExtractor;

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

struct TestHarness {
    orchestrator: Arc<UploadOrchestrator>,
    registry: Arc<UploadSessionRegistry>,
    storage: MemoryStorage,
}

fn harness_on(
    storage: MemoryStorage,
    extractor: Arc<dyn ThumbnailExtractor>,
    max_size_bytes: u64,
    max_sessions: usize,
) -> TestHarness {
    let registry = Arc::new(UploadSessionRegistry::new(
        Arc::new(storage.clone()),
        max_sessions,
    ));
    let orchestrator = Arc::new(UploadOrchestrator::new(
        registry.clone(),
        Arc::new(storage.clone()),
        extractor,
        UploadOrchestratorConfig {
            max_size_bytes,
            allowed_mime_prefixes: vec!["video/".to_string()],
            thumbnail_offset_secs: 1.0,
        },
    ));
    TestHarness {
        orchestrator,
        registry,
        storage,
    }
}

fn harness_with(
    extractor: Arc<dyn ThumbnailExtractor>,
    max_size_bytes: u64,
    max_sessions: usize,
) -> TestHarness {
    harness_on(MemoryStorage::new(), extractor, max_size_bytes, max_sessions)
}

fn harness() -> TestHarness {
    harness_with(Arc::new(StubExtractor), (64 * MIB) as u64, 8)
}

/// A body of `chunks` chunks of `chunk_size` bytes that then ends.
fn chunked(chunks: usize, chunk_size: usize) -> ByteStream<'static> {
    Box::pin(stream::iter((0..chunks).map(move |_| {
        Ok::<Bytes, std::io::Error>(Bytes::from(vec![7u8; chunk_size]))
    })))
}

/// A body that delivers `chunks` chunks and then stalls forever, so the
/// upload stays live until something cancels it.
fn stalled_after(chunks: usize, chunk_size: usize) -> ByteStream<'static> {
    let head = stream::iter((0..chunks).map(move |_| {
        Ok::<Bytes, std::io::Error>(Bytes::from(vec![7u8; chunk_size]))
    }));
    Box::pin(head.chain(stream::pending()))
}

fn empty_body() -> ByteStream<'static> {
    Box::pin(stream::empty::<std::io::Result<Bytes>>())
}

/// Wait until a session shows up for the owner, then return its id.
async fn only_session_id(registry: &UploadSessionRegistry, owner: &str) -> Uuid {
    for _ in 0..200 {
        let sessions = registry.list_for_owner(owner).await;
        if let Some(first) = sessions.first() {
            return first.id;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no session appeared for owner {}", owner);
}

/// Wait until the session has received at least `target` bytes.
async fn wait_for_bytes(registry: &UploadSessionRegistry, session_id: Uuid, target: u64) {
    for _ in 0..200 {
        if registry.get(session_id).await.unwrap().bytes_received >= target {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {} never reached {} bytes", session_id, target);
}

#[tokio::test]
async fn test_full_upload_completes_with_thumbnail() {
    let h = harness();

    let outcome = h
        .orchestrator
        .start_upload("user-1", "video/mp4", (10 * MIB) as u64, chunked(10, MIB))
        .await
        .unwrap();

    let (session_id, asset) = match outcome {
        UploadOutcome::Completed { session_id, asset } => (session_id, asset),
        other => panic!("expected completion, got {:?}", other),
    };

    assert!(asset.path.starts_with("videos/"));
    assert!(asset.path.ends_with(".mp4"));
    assert!(asset.url.contains(&asset.path));
    assert_eq!(asset.size_bytes, (10 * MIB) as u64);
    assert_eq!(asset.mime_type, "video/mp4");

    let thumbnail = asset.thumbnail_path.clone().expect("thumbnail should be set");
    assert!(thumbnail.ends_with(".jpg"));
    assert_eq!(h.storage.get_file(&thumbnail).unwrap(), b"stub-jpeg");
    assert_eq!(h.storage.stat(&asset.path).await.unwrap(), (10 * MIB) as u64);

    let snapshot = h.registry.get(session_id).await.unwrap();
    assert_eq!(snapshot.status, UploadStatus::Completed);
    assert_eq!(snapshot.bytes_received, (10 * MIB) as u64);
    assert!(snapshot.finished_at.is_some());
}

#[tokio::test]
async fn test_concurrent_uploads_get_unique_destinations() {
    let h = harness();

    let mut handles = Vec::new();
    for i in 0..4 {
        let orchestrator = h.orchestrator.clone();
        handles.push(tokio::spawn(async move {
            let owner = format!("user-{}", i);
            orchestrator
                .start_upload(&owner, "video/mp4", MIB as u64, chunked(1, MIB))
                .await
        }));
    }

    let mut paths = HashSet::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            UploadOutcome::Completed { asset, .. } => {
                assert!(paths.insert(asset.path), "destination key reused");
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    assert_eq!(paths.len(), 4);
    assert_eq!(h.registry.len().await, 4);
}

#[tokio::test]
async fn test_cancel_mid_stream_deletes_partial_file() {
    let h = harness();

    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move {
        orchestrator
            .start_upload(
                "user-1",
                "video/mp4",
                (10 * MIB) as u64,
                stalled_after(3, MIB),
            )
            .await
    });

    let session_id = only_session_id(&h.registry, "user-1").await;
    wait_for_bytes(&h.registry, session_id, (3 * MIB) as u64).await;

    h.orchestrator
        .cancel_upload(session_id, "user-1")
        .await
        .unwrap();

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(
        outcome,
        UploadOutcome::Cancelled { session_id: sid } if sid == session_id
    ));

    let snapshot = h.registry.get(session_id).await.unwrap();
    assert_eq!(snapshot.status, UploadStatus::Cancelled);
    assert_eq!(snapshot.bytes_received, (3 * MIB) as u64);
    assert!(snapshot.finished_at.is_some());
    assert!(matches!(
        h.storage.stat(&snapshot.destination_key).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_cancel_after_completion_is_idempotent() {
    let h = harness();

    let outcome = h
        .orchestrator
        .start_upload("user-1", "video/mp4", MIB as u64, chunked(1, MIB))
        .await
        .unwrap();
    let (session_id, asset) = match outcome {
        UploadOutcome::Completed { session_id, asset } => (session_id, asset),
        other => panic!("expected completion, got {:?}", other),
    };
    let stored = h.storage.get_file(&asset.path).unwrap();

    h.orchestrator
        .cancel_upload(session_id, "user-1")
        .await
        .unwrap();
    h.orchestrator
        .cancel_upload(session_id, "user-1")
        .await
        .unwrap();

    assert_eq!(
        h.registry.get(session_id).await.unwrap().status,
        UploadStatus::Completed
    );
    assert_eq!(h.storage.get_file(&asset.path).unwrap(), stored);
}

#[tokio::test]
async fn test_cancel_by_non_owner_is_forbidden() {
    let h = harness();

    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move {
        orchestrator
            .start_upload(
                "user-1",
                "video/mp4",
                (10 * MIB) as u64,
                stalled_after(1, MIB),
            )
            .await
    });

    let session_id = only_session_id(&h.registry, "user-1").await;
    wait_for_bytes(&h.registry, session_id, MIB as u64).await;

    let result = h.orchestrator.cancel_upload(session_id, "intruder").await;
    assert!(matches!(
        result,
        Err(UploadError::Session(SessionError::NotOwner(_)))
    ));
    assert_eq!(
        h.registry.get(session_id).await.unwrap().status,
        UploadStatus::Uploading
    );

    // The rightful owner can still cancel
    h.orchestrator
        .cancel_upload(session_id, "user-1")
        .await
        .unwrap();
    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, UploadOutcome::Cancelled { .. }));
}

#[tokio::test]
async fn test_ceiling_enforced_against_actual_bytes() {
    let h = harness_with(Arc::new(StubExtractor), (4 * MIB) as u64, 8);

    // The declared size stays under the ceiling; the stream does not
    let result = h
        .orchestrator
        .start_upload("user-1", "video/mp4", MIB as u64, chunked(6, MIB))
        .await;
    assert!(matches!(
        result,
        Err(UploadError::CeilingExceeded { max, .. }) if max == (4 * MIB) as u64
    ));

    let sessions = h.registry.list_for_owner("user-1").await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, UploadStatus::Failed);
    assert!(matches!(
        h.storage.stat(&sessions[0].destination_key).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_rejected_mime_creates_no_session() {
    let h = harness();

    let result = h
        .orchestrator
        .start_upload("user-1", "image/png", MIB as u64, chunked(1, MIB))
        .await;

    assert!(matches!(result, Err(UploadError::Validation(_))));
    assert_eq!(h.registry.len().await, 0);
    assert_eq!(h.storage.file_count(), 0);
}

#[tokio::test]
async fn test_declared_size_above_ceiling_rejected_upfront() {
    let h = harness_with(Arc::new(StubExtractor), (4 * MIB) as u64, 8);

    let result = h
        .orchestrator
        .start_upload("user-1", "video/mp4", (5 * MIB) as u64, chunked(1, MIB))
        .await;

    assert!(matches!(result, Err(UploadError::Validation(_))));
    assert_eq!(h.registry.len().await, 0);
}

#[tokio::test]
async fn test_extraction_failure_still_completes() {
    let h = harness_with(Arc::new(FailingExtractor), (64 * MIB) as u64, 8);

    // Zero-byte body: the declared size is advisory, the stream just ends
    let outcome = h
        .orchestrator
        .start_upload("user-1", "video/mp4", MIB as u64, empty_body())
        .await
        .unwrap();

    match outcome {
        UploadOutcome::Completed { session_id, asset } => {
            assert_eq!(asset.size_bytes, 0);
            assert!(asset.thumbnail_path.is_none());
            assert!(!asset.has_thumbnail());
            assert!(h.storage.has_file(&asset.path));
            assert_eq!(
                h.registry.get(session_id).await.unwrap().status,
                UploadStatus::Completed
            );
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_error_fails_session_and_cleans_up() {
    let h = harness();

    let broken: ByteStream<'static> = Box::pin(stream::iter(vec![
        Ok(Bytes::from(vec![7u8; MIB])),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "peer reset",
        )),
    ]));

    let result = h
        .orchestrator
        .start_upload("user-1", "video/mp4", (10 * MIB) as u64, broken)
        .await;
    assert!(matches!(result, Err(UploadError::Stream(_))));

    let sessions = h.registry.list_for_owner("user-1").await;
    assert_eq!(sessions[0].status, UploadStatus::Failed);
    assert!(!h.storage.has_file(&sessions[0].destination_key));
}

#[tokio::test]
async fn test_storage_write_failure_fails_session() {
    let storage = MemoryStorage::new().fail_writes_after(MIB as u64);
    let h = harness_on(storage, Arc::new(StubExtractor), (64 * MIB) as u64, 8);

    let result = h
        .orchestrator
        .start_upload("user-1", "video/mp4", (10 * MIB) as u64, chunked(3, MIB))
        .await;
    assert!(matches!(result, Err(UploadError::Storage(_))));

    let sessions = h.registry.list_for_owner("user-1").await;
    assert_eq!(sessions[0].status, UploadStatus::Failed);
    assert!(!h.storage.has_file(&sessions[0].destination_key));
}

#[tokio::test]
async fn test_capacity_limit_blocks_and_frees() {
    let h = harness_with(Arc::new(StubExtractor), (64 * MIB) as u64, 1);

    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move {
        orchestrator
            .start_upload(
                "user-1",
                "video/mp4",
                (10 * MIB) as u64,
                stalled_after(1, MIB),
            )
            .await
    });
    let session_id = only_session_id(&h.registry, "user-1").await;

    let result = h
        .orchestrator
        .start_upload("user-2", "video/mp4", MIB as u64, chunked(1, MIB))
        .await;
    assert!(matches!(
        result,
        Err(UploadError::Session(SessionError::CapacityExceeded { .. }))
    ));

    h.orchestrator
        .cancel_upload(session_id, "user-1")
        .await
        .unwrap();
    task.await.unwrap().unwrap();

    // Terminal sessions no longer count against the ceiling
    let outcome = h
        .orchestrator
        .start_upload("user-2", "video/mp4", MIB as u64, chunked(1, MIB))
        .await
        .unwrap();
    assert!(matches!(outcome, UploadOutcome::Completed { .. }));
}

#[tokio::test]
async fn test_direct_thumbnail_extraction() {
    let h = harness();
    h.storage.set_file("videos/existing.mp4", vec![7u8; 1024]);

    let thumbnail_key = h
        .orchestrator
        .extract_thumbnail("videos/existing.mp4")
        .await
        .unwrap();

    assert_eq!(thumbnail_key, "videos/existing.jpg");
    assert_eq!(h.storage.get_file(&thumbnail_key).unwrap(), b"stub-jpeg");
}

#[tokio::test]
async fn test_direct_thumbnail_extraction_surfaces_failure() {
    let h = harness_with(Arc::new(FailingExtractor), (64 * MIB) as u64, 8);
    h.storage.set_file("videos/corrupt.mp4", vec![0u8; 16]);

    let result = h.orchestrator.extract_thumbnail("videos/corrupt.mp4").await;
    assert!(matches!(
        result,
        Err(UploadError::Extraction(ExtractionError::Ffmpeg(_)))
    ));
    assert!(!h.storage.has_file("videos/corrupt.jpg"));
}

#[tokio::test]
async fn test_direct_thumbnail_extraction_missing_video() {
    let h = harness();

    let result = h.orchestrator.extract_thumbnail("videos/missing.mp4").await;
    assert!(matches!(
        result,
        Err(UploadError::Storage(StorageError::NotFound(_)))
    ));
}
