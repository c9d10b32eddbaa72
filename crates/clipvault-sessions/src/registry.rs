//! Upload session registry
//!
//! Process-wide table of live and recently finished upload sessions. The
//! registry enforces the status state machine, the concurrent session
//! ceiling, and the cleanup contract: a session never reaches `cancelled` or
//! `failed` while its partial file is still in storage.
//!
//! Locking: one async mutex around the map, held only for map access. The
//! partial-file delete in `finish_cancelled`/`finish_failed` runs between
//! two short lock sections, never under the lock.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use clipvault_core::{SessionSnapshot, UploadStatus};
use clipvault_storage::{Storage, StorageError};

use crate::session::SessionEntry;

/// Session registry errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Session {0} belongs to another owner")]
    NotOwner(Uuid),

    #[error("Upload capacity exceeded: {active} live sessions, limit {limit}")]
    CapacityExceeded { active: usize, limit: usize },

    #[error("Invalid status transition for session {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: UploadStatus,
        to: UploadStatus,
    },

    #[error("Session {0} is not terminal")]
    NotTerminal(Uuid),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Counters from one reaper pass (see [`UploadSessionRegistry::reap_stale`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct ReapStats {
    /// Stale live sessions whose cancel signal was fired this pass.
    pub cancel_requested: usize,
    /// Stale live sessions force-failed because a previously fired signal
    /// went unanswered.
    pub force_failed: usize,
    /// Terminal sessions removed after their retention period.
    pub removed: usize,
}

/// In-memory upload session table shared across the process.
pub struct UploadSessionRegistry {
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
    storage: Arc<dyn Storage>,
    max_live_sessions: usize,
}

impl UploadSessionRegistry {
    pub fn new(storage: Arc<dyn Storage>, max_live_sessions: usize) -> Self {
        UploadSessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            storage,
            max_live_sessions,
        }
    }

    /// Insert a new `pending` session. The capacity ceiling counts live
    /// (non-terminal) sessions and is checked atomically under the map lock.
    pub async fn create(
        &self,
        owner_id: &str,
        destination_key: &str,
        declared_size: u64,
    ) -> Result<Uuid, SessionError> {
        let mut sessions = self.sessions.lock().await;

        let active = sessions.values().filter(|e| !e.status.is_terminal()).count();
        if active >= self.max_live_sessions {
            return Err(SessionError::CapacityExceeded {
                active,
                limit: self.max_live_sessions,
            });
        }

        let entry = SessionEntry::new(owner_id, destination_key, declared_size);
        let id = entry.id;
        sessions.insert(id, entry);

        tracing::info!(
            session_id = %id,
            owner_id = %owner_id,
            destination_key = %destination_key,
            declared_size = declared_size,
            "Upload session created"
        );

        Ok(id)
    }

    /// Point-in-time snapshot of a session.
    pub async fn get(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&id)
            .map(|e| e.snapshot())
            .ok_or(SessionError::NotFound(id))
    }

    /// Snapshot with an ownership check, for caller-facing lookups.
    pub async fn get_for_owner(
        &self,
        id: Uuid,
        owner_id: &str,
    ) -> Result<SessionSnapshot, SessionError> {
        let sessions = self.sessions.lock().await;
        let entry = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        if entry.owner_id != owner_id {
            return Err(SessionError::NotOwner(id));
        }
        Ok(entry.snapshot())
    }

    /// All sessions belonging to an owner, newest first. Live sessions and
    /// terminal sessions still inside their retention period both appear.
    pub async fn list_for_owner(&self, owner_id: &str) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.lock().await;
        let mut snapshots: Vec<SessionSnapshot> = sessions
            .values()
            .filter(|e| e.owner_id == owner_id)
            .map(|e| e.snapshot())
            .collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    /// Clone of the session's cancel signal, for the streaming task.
    pub async fn cancel_token(&self, id: Uuid) -> Result<CancellationToken, SessionError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&id)
            .map(|e| e.cancel_token.clone())
            .ok_or(SessionError::NotFound(id))
    }

    /// Add received bytes to the session counter, returning the new total.
    /// Only the streaming task calls this.
    pub async fn advance(&self, id: Uuid, bytes_delta: u64) -> Result<u64, SessionError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        entry.bytes_received += bytes_delta;
        Ok(entry.bytes_received)
    }

    /// Move a session to the next status, enforcing the state machine.
    ///
    /// Callers finalizing a session as `cancelled` or `failed` use
    /// [`finish_cancelled`](Self::finish_cancelled) /
    /// [`finish_failed`](Self::finish_failed) instead, which delete the
    /// partial file before committing the terminal status.
    pub async fn transition(&self, id: Uuid, next: UploadStatus) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;

        if !entry.status.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                id,
                from: entry.status,
                to: next,
            });
        }

        entry.status = next;
        if next.is_terminal() {
            entry.finished_at = Some(Utc::now());
        }

        tracing::debug!(session_id = %id, status = %next, "Session status transition");
        Ok(())
    }

    /// Request cancellation on behalf of the session owner.
    ///
    /// Fires the cancel signal and returns immediately; the streaming task
    /// observes the signal at its next chunk boundary and finalizes the
    /// session itself. Cancelling an already terminal session is a no-op
    /// success, so duplicate cancel requests stay idempotent.
    pub async fn request_cancel(&self, id: Uuid, owner_id: &str) -> Result<(), SessionError> {
        let sessions = self.sessions.lock().await;
        let entry = sessions.get(&id).ok_or(SessionError::NotFound(id))?;

        if entry.owner_id != owner_id {
            return Err(SessionError::NotOwner(id));
        }

        if entry.status.is_terminal() {
            tracing::debug!(
                session_id = %id,
                status = %entry.status,
                "Cancel requested for terminal session, nothing to do"
            );
            return Ok(());
        }

        entry.cancel_token.cancel();
        tracing::info!(session_id = %id, owner_id = %owner_id, "Upload cancellation requested");
        Ok(())
    }

    /// Finalize a session as `cancelled`: delete the partial file, then
    /// commit the terminal status. No-op success when already terminal.
    pub async fn finish_cancelled(&self, id: Uuid) -> Result<(), SessionError> {
        self.finish_aborted(id, UploadStatus::Cancelled).await
    }

    /// Finalize a session as `failed`: delete the partial file, then commit
    /// the terminal status. No-op success when already terminal.
    pub async fn finish_failed(&self, id: Uuid) -> Result<(), SessionError> {
        self.finish_aborted(id, UploadStatus::Failed).await
    }

    async fn finish_aborted(&self, id: Uuid, terminal: UploadStatus) -> Result<(), SessionError> {
        // First lock section: read the key, skip sessions already finalized
        let destination_key = {
            let sessions = self.sessions.lock().await;
            let entry = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
            if entry.status.is_terminal() {
                return Ok(());
            }
            entry.destination_key.clone()
        };

        // Storage I/O with the lock released
        let delete_result = self.storage.delete(&destination_key).await;

        // Second lock section: commit the terminal status
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if entry.status.is_terminal() {
            return Ok(());
        }

        match delete_result {
            Ok(()) => {
                entry.status = terminal;
                entry.finished_at = Some(Utc::now());
                tracing::info!(
                    session_id = %id,
                    status = %terminal,
                    bytes_received = entry.bytes_received,
                    "Upload session finalized"
                );
                Ok(())
            }
            Err(e) => {
                // The partial file could not be removed; the session still
                // must end terminal. Mark it failed and surface the error.
                entry.status = UploadStatus::Failed;
                entry.finished_at = Some(Utc::now());
                tracing::error!(
                    session_id = %id,
                    destination_key = %destination_key,
                    error = %e,
                    "Failed to delete partial file while finalizing session"
                );
                Err(SessionError::Storage(e))
            }
        }
    }

    /// Permanently drop a session entry. Only legal once terminal.
    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        if !entry.status.is_terminal() {
            return Err(SessionError::NotTerminal(id));
        }
        sessions.remove(&id);
        tracing::debug!(session_id = %id, "Upload session removed");
        Ok(())
    }

    /// Number of live (non-terminal) sessions.
    pub async fn live_count(&self) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.values().filter(|e| !e.status.is_terminal()).count()
    }

    /// Total entries, terminal ones included.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// One reaper pass over the table.
    ///
    /// Live sessions older than `stale_age` get their cancel signal fired;
    /// if a later pass finds the signal already fired and the session still
    /// live, its streaming task is gone and the session is force-failed
    /// (partial file deleted). Terminal sessions older than `retention` are
    /// removed.
    pub async fn reap_stale(&self, stale_age: Duration, retention: Duration) -> ReapStats {
        let now = Utc::now();
        let stale_cutoff = now - stale_age;
        let retention_cutoff = now - retention;

        let mut stats = ReapStats::default();
        let mut to_force_fail: Vec<Uuid> = Vec::new();

        {
            let mut sessions = self.sessions.lock().await;

            let mut to_remove: Vec<Uuid> = Vec::new();
            for (id, entry) in sessions.iter() {
                if entry.status.is_terminal() {
                    if entry.finished_at.is_some_and(|t| t < retention_cutoff) {
                        to_remove.push(*id);
                    }
                } else if entry.created_at < stale_cutoff {
                    if entry.cancel_token.is_cancelled() {
                        to_force_fail.push(*id);
                    } else {
                        entry.cancel_token.cancel();
                        stats.cancel_requested += 1;
                        tracing::warn!(
                            session_id = %id,
                            status = %entry.status,
                            created_at = %entry.created_at,
                            "Stale upload session, cancel signal fired"
                        );
                    }
                }
            }

            for id in to_remove {
                sessions.remove(&id);
                stats.removed += 1;
            }
        }

        // Force-fail outside the lock; finish_failed does storage I/O
        for id in to_force_fail {
            match self.finish_failed(id).await {
                Ok(()) => {
                    stats.force_failed += 1;
                    tracing::warn!(session_id = %id, "Abandoned upload session force-failed");
                }
                Err(e) => {
                    tracing::error!(
                        session_id = %id,
                        error = %e,
                        "Failed to force-fail abandoned session"
                    );
                }
            }
        }

        stats
    }
}
