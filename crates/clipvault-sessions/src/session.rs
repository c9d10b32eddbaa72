use chrono::{DateTime, Utc};
use clipvault_core::{SessionSnapshot, UploadStatus};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Mutable per-upload record. Lives inside the registry map; fields are only
/// touched while the map lock is held. Everything outside the registry sees
/// `SessionSnapshot` copies.
pub(crate) struct SessionEntry {
    pub id: Uuid,
    pub owner_id: String,
    pub status: UploadStatus,
    pub declared_size: u64,
    pub bytes_received: u64,
    pub destination_key: String,
    /// Set-once cancel signal shared with the streaming task.
    pub cancel_token: CancellationToken,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SessionEntry {
    pub fn new(owner_id: &str, destination_key: &str, declared_size: u64) -> Self {
        SessionEntry {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            status: UploadStatus::Pending,
            declared_size,
            bytes_received: 0,
            destination_key: destination_key.to_string(),
            cancel_token: CancellationToken::new(),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            owner_id: self.owner_id.clone(),
            status: self.status,
            declared_size: self.declared_size,
            bytes_received: self.bytes_received,
            destination_key: self.destination_key.clone(),
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}
