//! In-memory storage backend
//!
//! Stores blobs in a process-local map. Shared by the test suites and usable
//! for ephemeral deployments where nothing should survive a restart.

use crate::traits::{BlobWriter, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory storage implementation
#[derive(Clone)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    base_url: String,
    fail_writes_after: Option<u64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            base_url: "https://example.com/files".to_string(),
            fail_writes_after: None,
        }
    }

    /// Arm streamed writes to fail once the given byte count would be
    /// exceeded. Lets tests exercise mid-stream storage failure handling.
    pub fn fail_writes_after(mut self, bytes: u64) -> Self {
        self.fail_writes_after = Some(bytes);
        self
    }

    /// Set a file directly (for test setup)
    pub fn set_file(&self, key: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(key.to_string(), data);
    }

    /// Check if a file exists (for test assertions)
    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    /// Get file data (for test assertions)
    pub fn get_file(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }

    /// Number of stored files (for test assertions)
    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryBlobWriter {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    key: String,
    buffer: Vec<u8>,
    committed: bool,
    fail_after: Option<u64>,
}

#[async_trait]
impl BlobWriter for MemoryBlobWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> StorageResult<usize> {
        if let Some(limit) = self.fail_after {
            if (self.buffer.len() + chunk.len()) as u64 > limit {
                return Err(StorageError::UploadFailed(
                    "armed write failure".to_string(),
                ));
            }
        }
        self.buffer.extend_from_slice(chunk);
        Ok(chunk.len())
    }

    async fn finish(mut self: Box<Self>) -> StorageResult<u64> {
        let total = self.buffer.len() as u64;
        self.files
            .lock()
            .unwrap()
            .insert(self.key.clone(), std::mem::take(&mut self.buffer));
        self.committed = true;
        Ok(total)
    }
}

impl Drop for MemoryBlobWriter {
    fn drop(&mut self) {
        // An abandoned writer leaves its partial bytes at the key, like a
        // partial file on disk. Cleanup is the caller's delete.
        if !self.committed {
            self.files
                .lock()
                .unwrap()
                .insert(self.key.clone(), std::mem::take(&mut self.buffer));
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create(&self, key: &str) -> StorageResult<Box<dyn BlobWriter>> {
        Ok(Box::new(MemoryBlobWriter {
            files: Arc::clone(&self.files),
            key: key.to_string(),
            buffer: Vec::new(),
            committed: false,
            fail_after: self.fail_writes_after,
        }))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<String> {
        self.files.lock().unwrap().insert(key.to_string(), data);
        Ok(self.url_for(key))
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    async fn stat(&self, key: &str) -> StorageResult<u64> {
        self.files
            .lock()
            .unwrap()
            .get(key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_read_delete() {
        let storage = MemoryStorage::new();

        storage.put("videos/a.mp4", b"data".to_vec()).await.unwrap();
        assert_eq!(storage.read("videos/a.mp4").await.unwrap(), b"data");
        assert_eq!(storage.stat("videos/a.mp4").await.unwrap(), 4);

        storage.delete("videos/a.mp4").await.unwrap();
        assert!(matches!(
            storage.read("videos/a.mp4").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let storage = MemoryStorage::new();
        assert!(storage.delete("never/existed.mp4").await.is_ok());
    }

    #[tokio::test]
    async fn test_streamed_write_commits_on_finish() {
        let storage = MemoryStorage::new();

        let mut writer = storage.create("videos/s.mp4").await.unwrap();
        writer.write_chunk(b"ab").await.unwrap();
        writer.write_chunk(b"cd").await.unwrap();
        let total = writer.finish().await.unwrap();

        assert_eq!(total, 4);
        assert_eq!(storage.get_file("videos/s.mp4").unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn test_dropped_writer_leaves_partial_until_delete() {
        let storage = MemoryStorage::new();

        let mut writer = storage.create("videos/p.mp4").await.unwrap();
        writer.write_chunk(b"partial").await.unwrap();
        drop(writer);

        assert!(storage.has_file("videos/p.mp4"));

        storage.delete("videos/p.mp4").await.unwrap();
        assert_eq!(storage.file_count(), 0);
    }

    #[tokio::test]
    async fn test_armed_write_failure() {
        let storage = MemoryStorage::new().fail_writes_after(4);

        let mut writer = storage.create("videos/f.mp4").await.unwrap();
        writer.write_chunk(b"1234").await.unwrap();
        let result = writer.write_chunk(b"5").await;

        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }
}
