//! Clipvault Storage Library
//!
//! This crate provides the storage abstraction and backends for uploaded
//! videos: the Storage trait with its streamed BlobWriter, a local
//! filesystem implementation, and an in-memory implementation.
//!
//! # Storage key format
//!
//! Videos are keyed `videos/{uuid}.{ext}` and each thumbnail sits next to
//! its video as `videos/{uuid}.jpg`. Keys must not contain `..` or a leading
//! `/`. Key generation is centralized in the `keys` module so all producers
//! stay consistent.

pub mod keys;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use traits::{BlobWriter, Storage, StorageError, StorageResult};
