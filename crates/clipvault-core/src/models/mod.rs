//! Data models for the upload service
//!
//! Plain data types shared across crates. Live session state (with its
//! cancellation token) lives in the sessions crate; these are the read-side
//! and response-side shapes.

mod asset;
mod session;

// Re-export all models for convenient imports
pub use asset::*;
pub use session::*;
