//! Stale session reaper
//!
//! Background loop that bounds resource usage from abandoned clients. Each
//! pass fires the cancel signal of sessions stuck live past the staleness
//! threshold, force-fails sessions whose signal went unanswered, and drops
//! terminal sessions once their duplicate-cancel grace period has passed.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::registry::UploadSessionRegistry;

#[derive(Clone)]
pub struct SessionReaperConfig {
    /// Interval in seconds between passes. 0 = disabled.
    pub reap_interval_secs: u64,
    /// Age in seconds after which a live session counts as abandoned.
    pub stale_age_secs: i64,
    /// Retention in seconds for terminal sessions.
    pub retention_secs: i64,
}

impl Default for SessionReaperConfig {
    fn default() -> Self {
        Self {
            reap_interval_secs: 60,
            stale_age_secs: 900,
            retention_secs: 300,
        }
    }
}

pub struct SessionReaper {
    shutdown_tx: mpsc::Sender<()>,
}

impl SessionReaper {
    /// Spawn the reaper loop. With a zero interval no task is spawned and
    /// the returned handle's shutdown is a no-op.
    pub fn spawn(registry: Arc<UploadSessionRegistry>, config: SessionReaperConfig) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.reap_interval_secs > 0 {
            let reap_interval = Duration::from_secs(config.reap_interval_secs);
            let stale_age = chrono::Duration::seconds(config.stale_age_secs);
            let retention = chrono::Duration::seconds(config.retention_secs);

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(reap_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let stats = registry.reap_stale(stale_age, retention).await;
                            if stats.cancel_requested > 0 || stats.force_failed > 0 || stats.removed > 0 {
                                tracing::info!(
                                    cancel_requested = stats.cancel_requested,
                                    force_failed = stats.force_failed,
                                    removed = stats.removed,
                                    "Stale session reaper pass finished"
                                );
                            }
                        }
                        _ = shutdown_rx.recv() => break,
                    }
                }
                tracing::info!("Stale session reaper stopped");
            });
        }

        Self { shutdown_tx }
    }

    /// Signal the loop to stop. Does not wait for an in-flight pass.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
