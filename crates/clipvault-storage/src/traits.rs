//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Streamed writer for a single blob.
///
/// Returned by [`Storage::create`]. The writer owns whatever resource backs
/// the blob (file handle, buffer) and releases it on every exit path.
/// Dropping a writer without calling `finish` releases the resource but
/// leaves any bytes already written at the key; cleanup is the caller's
/// `delete`.
#[async_trait]
pub trait BlobWriter: Send {
    /// Append a chunk, returning the number of bytes written.
    async fn write_chunk(&mut self, chunk: &[u8]) -> StorageResult<usize>;

    /// Flush and durably commit the blob, returning the total byte count.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;
}

/// Storage abstraction trait
///
/// All storage backends (local filesystem, in-memory) must implement this
/// trait. The upload pipeline works against it without coupling to specific
/// backend details.
///
/// **Key format:** videos are keyed `videos/{uuid}.{ext}`, thumbnails
/// `videos/{uuid}.jpg`. See the `keys` module.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a streamed writer at the given key, truncating anything there.
    async fn create(&self, key: &str) -> StorageResult<Box<dyn BlobWriter>>;

    /// Write a whole blob in one call. Returns the public URL.
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Read a whole blob into memory.
    async fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a blob. Deleting a missing key is Ok (idempotent).
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Size in bytes of the blob, or `StorageError::NotFound`.
    async fn stat(&self, key: &str) -> StorageResult<u64>;

    /// Public URL for a key.
    fn url_for(&self, key: &str) -> String;
}
