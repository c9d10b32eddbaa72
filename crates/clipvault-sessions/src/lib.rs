//! Clipvault Sessions Library
//!
//! This crate owns upload session lifecycle: the in-memory registry with its
//! status state machine, per-session cancellation tokens, the concurrent
//! session ceiling, and the background reaper that cleans up abandoned and
//! expired sessions.

pub mod reaper;
pub mod registry;
mod session;

// Re-export commonly used types
pub use reaper::{SessionReaper, SessionReaperConfig};
pub use registry::{ReapStats, SessionError, UploadSessionRegistry};
