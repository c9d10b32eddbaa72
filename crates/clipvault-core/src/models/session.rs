use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Processing,
    Completed,
    Cancelled,
    Failed,
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Processing => write!(f, "processing"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Cancelled => write!(f, "cancelled"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

impl UploadStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Cancelled | UploadStatus::Failed
        )
    }

    /// The legal status transitions. The happy path is
    /// pending -> uploading -> processing -> completed; every non-terminal
    /// status may also end in cancelled or failed.
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, next),
            (Pending, Uploading)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Uploading, Processing)
                | (Uploading, Cancelled)
                | (Uploading, Failed)
                | (Processing, Completed)
                | (Processing, Cancelled)
                | (Processing, Failed)
        )
    }
}

/// Point-in-time view of an upload session. All reads of session state go
/// through snapshots; live fields are only mutated inside the registry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub owner_id: String,
    pub status: UploadStatus,
    /// Size the client declared up front. Advisory; the hard ceiling is
    /// enforced against bytes actually received.
    pub declared_size: u64,
    pub bytes_received: u64,
    pub destination_key: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
