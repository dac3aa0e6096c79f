//! # Sync Orchestration
//!
//! Drives the pull-merge-push cycle between the local stores and the remote
//! store. One sync may be in flight per user at a time; triggers arriving
//! while one runs are dropped, not queued, and an in-flight sync always runs
//! to completion.
//!
//! ## Full-sync algorithm (progress)
//!
//! 1. Pull the remote record. Absent means a new user: push local as-is and
//!    stop.
//! 2. Merge local and remote through the conflict resolver.
//! 3. Persist the merged snapshot locally and re-evaluate reward unlocks.
//!    Topics arriving from another device are written directly; no XP is
//!    re-awarded for them.
//! 4. If the merged snapshot differs from the remote record, push it.
//! 5. Push the current local snapshot once more, unconditionally. The
//!    double-push guards against a local write landing between pull and
//!    push.
//!
//! Any failure enqueues a retry operation and propagates to the caller.
//! Background callers log it; a manual sync can surface a transient-failure
//! indicator. Profile sync is an independent cycle with the same shape but
//! last-write-wins scalars instead of a merge.

pub mod monitor;
pub mod scheduler;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::SyncError;
use crate::merge::merge_progress;
use crate::remote::RemoteStore;
use crate::store::LocalStore;
use crate::types::{LocalProfile, ProgressSnapshot, SyncKind};

/// How a sync attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cycle ran to completion
    Completed,
    /// Dropped because a sync for this user was already in flight
    Skipped,
}

/// Current synchronization state, for the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    /// Whether a sync is currently running
    pub syncing: bool,
    /// Last successful sync timestamp
    pub last_sync: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared on success
    pub last_error: Option<String>,
    /// Number of queued retry operations
    pub pending_operations: usize,
}

/// Sync orchestrator.
///
/// Owns the retry queue (sole writer) and is the sole caller of the remote
/// adapter.
#[derive(Debug)]
pub struct SyncEngine {
    store: Arc<LocalStore>,
    remote: Arc<RemoteStore>,
    in_flight: Mutex<HashSet<String>>,
    status: RwLock<SyncStatus>,
}

impl SyncEngine {
    pub fn new(store: Arc<LocalStore>, remote: Arc<RemoteStore>) -> Self {
        Self {
            store,
            remote,
            in_flight: Mutex::new(HashSet::new()),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    /// Get current sync status
    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Run a full sync: progress, then profile.
    ///
    /// The manual pull-to-refresh entry point. Safe to call concurrently
    /// with automatic triggers; the in-flight guard drops the extra call.
    pub async fn perform_sync(&self, user_id: &str) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.try_begin(user_id) else {
            tracing::debug!(user_id, "sync already in flight, dropping trigger");
            return Ok(SyncOutcome::Skipped);
        };

        self.begin_status().await;
        let progress = self.run_progress_sync(user_id).await;
        let profile = self.run_profile_sync(user_id).await;
        let result = progress.and(profile);
        self.finish_status(user_id, &result).await;
        result.map(|_| SyncOutcome::Completed)
    }

    /// Run the progress cycle only.
    pub async fn sync_progress(&self, user_id: &str) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.try_begin(user_id) else {
            tracing::debug!(user_id, "sync already in flight, dropping trigger");
            return Ok(SyncOutcome::Skipped);
        };

        self.begin_status().await;
        let result = self.run_progress_sync(user_id).await;
        self.finish_status(user_id, &result).await;
        result.map(|_| SyncOutcome::Completed)
    }

    /// Run the profile cycle only.
    pub async fn sync_profile(&self, user_id: &str) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.try_begin(user_id) else {
            tracing::debug!(user_id, "sync already in flight, dropping trigger");
            return Ok(SyncOutcome::Skipped);
        };

        self.begin_status().await;
        let result = self.run_profile_sync(user_id).await;
        self.finish_status(user_id, &result).await;
        result.map(|_| SyncOutcome::Completed)
    }

    /// Drain the retry queue for a user.
    ///
    /// Queued entries are a signal, not a diff: one full sync per kind
    /// present covers every entry, and all of them are removed on success.
    pub async fn process_sync_queue(&self, user_id: &str) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.try_begin(user_id) else {
            tracing::debug!(user_id, "sync already in flight, dropping queue drain");
            return Ok(SyncOutcome::Skipped);
        };

        let pending = self.store.queue_for_user(user_id).await;
        if pending.is_empty() {
            return Ok(SyncOutcome::Completed);
        }
        tracing::info!(user_id, pending = pending.len(), "draining sync queue");

        self.begin_status().await;
        let kinds: HashSet<SyncKind> = pending.iter().map(|op| op.kind).collect();

        let mut result = Ok(());
        if kinds.contains(&SyncKind::Progress) {
            result = self.run_progress_sync(user_id).await;
        }
        if result.is_ok() && kinds.contains(&SyncKind::Profile) {
            result = self.run_profile_sync(user_id).await;
        }

        if result.is_ok() {
            let ids: Vec<String> = pending.into_iter().map(|op| op.id).collect();
            if let Err(err) = self.store.remove_operations(&ids).await {
                tracing::error!(user_id, error = %err, "failed to remove drained queue entries");
            }
        }

        self.finish_status(user_id, &result).await;
        result.map(|_| SyncOutcome::Completed)
    }

    /// Two-tier read: local state when present, else the remote record
    /// (cached locally on the way through), else the zero snapshot.
    ///
    /// Never fails; both fallback tiers degrade to the tier below.
    pub async fn load_progress(&self, user_id: &str) -> ProgressSnapshot {
        let local = self.store.progress(user_id).await;
        if local != ProgressSnapshot::default() {
            return local;
        }

        match self.remote.fetch_progress(user_id).await {
            Ok(Some(record)) => {
                let snapshot = record.snapshot();
                if let Err(err) = self.store.write_progress(user_id, &snapshot).await {
                    tracing::warn!(user_id, error = %err, "failed to cache remote progress");
                }
                snapshot
            }
            Ok(None) => local,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "remote fallback read failed");
                local
            }
        }
    }

    /// Drop the user's queued retries. Called on logout; local state is
    /// abandoned, not purged.
    pub async fn handle_logout(&self, user_id: &str) -> Result<(), SyncError> {
        self.store.clear_queue_for_user(user_id).await
    }

    fn try_begin(&self, user_id: &str) -> Option<InFlightGuard<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(user_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            engine: self,
            user_id: user_id.to_string(),
        })
    }

    async fn run_progress_sync(&self, user_id: &str) -> Result<(), SyncError> {
        let result = self.progress_cycle(user_id).await;
        if let Err(err) = &result {
            self.enqueue_retry(user_id, SyncKind::Progress, err).await;
        }
        result
    }

    async fn progress_cycle(&self, user_id: &str) -> Result<(), SyncError> {
        let local = self.store.progress(user_id).await;

        let remote_record = match self.remote.fetch_progress(user_id).await? {
            Some(record) => record,
            None => {
                tracing::info!(user_id, "no remote progress record, pushing local state");
                self.remote.upsert_progress(user_id, &local).await?;
                return Ok(());
            }
        };

        let merged = merge_progress(&local, &remote_record);

        self.store.write_progress(user_id, &merged).await?;
        let newly = self.store.refresh_unlocks(user_id).await?;
        if !newly.is_empty() {
            tracing::info!(user_id, unlocked = ?newly, "reconciliation unlocked avatars");
        }

        if merged != remote_record.snapshot() {
            self.remote.upsert_progress(user_id, &merged).await?;
        }

        // The local copy is authoritative for this device and may have
        // advanced while the merge was in flight.
        let current = self.store.progress(user_id).await;
        self.remote.upsert_progress(user_id, &current).await?;

        tracing::debug!(user_id, "progress sync completed");
        Ok(())
    }

    async fn run_profile_sync(&self, user_id: &str) -> Result<(), SyncError> {
        let result = self.profile_cycle(user_id).await;
        if let Err(err) = &result {
            self.enqueue_retry(user_id, SyncKind::Profile, err).await;
        }
        result
    }

    async fn profile_cycle(&self, user_id: &str) -> Result<(), SyncError> {
        let local = self.store.profile(user_id).await;

        let remote_record = match self.remote.fetch_profile(user_id).await? {
            Some(record) => record,
            None => {
                let unlocked = self.store.unlocked_avatars(user_id).await;
                self.remote.upsert_profile(user_id, &local, &unlocked).await?;
                return Ok(());
            }
        };

        // Unlocked avatars are a monotonic set: union both ways regardless
        // of which side wrote last.
        self.store
            .merge_unlocked(user_id, &remote_record.unlocked_ids())
            .await?;
        let unlocked = self.store.unlocked_avatars(user_id).await;

        let local_ts = local.updated_at.unwrap_or(DateTime::<Utc>::MIN_UTC);
        if remote_record.updated_at > local_ts {
            // Remote wins the scalar fields.
            let adopted = LocalProfile {
                name: remote_record.name.clone(),
                avatar_id: remote_record.avatar_id(),
                updated_at: Some(remote_record.updated_at),
            };
            self.store.write_profile(user_id, &adopted).await?;

            if unlocked != remote_record.unlocked_ids() {
                self.remote.upsert_profile(user_id, &adopted, &unlocked).await?;
            }
        } else {
            self.remote.upsert_profile(user_id, &local, &unlocked).await?;
        }

        tracing::debug!(user_id, "profile sync completed");
        Ok(())
    }

    async fn enqueue_retry(&self, user_id: &str, kind: SyncKind, err: &SyncError) {
        match err {
            SyncError::Permission { .. } => {
                tracing::error!(user_id, kind = kind.as_str(), error = %err,
                    "sync rejected by remote store, queued for retry");
            }
            _ => {
                tracing::warn!(user_id, kind = kind.as_str(), error = %err,
                    "sync failed, queued for retry");
            }
        }

        let payload = serde_json::json!({ "error": err.to_string() });
        if let Err(queue_err) = self.store.enqueue(kind, user_id, Some(payload)).await {
            tracing::error!(user_id, error = %queue_err, "failed to enqueue sync retry");
        }
    }

    async fn begin_status(&self) {
        let mut status = self.status.write().await;
        status.syncing = true;
    }

    async fn finish_status(&self, user_id: &str, result: &Result<(), SyncError>) {
        let pending = self.store.queue_for_user(user_id).await.len();
        let mut status = self.status.write().await;
        status.syncing = false;
        status.pending_operations = pending;
        match result {
            Ok(()) => {
                status.last_sync = Some(Utc::now());
                status.last_error = None;
            }
            Err(err) => status.last_error = Some(err.to_string()),
        }
    }
}

/// Releases the per-user in-flight slot when the sync ends, however it ends.
struct InFlightGuard<'a> {
    engine: &'a SyncEngine,
    user_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.engine
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_engine() -> (SyncEngine, tempfile::TempDir) {
        let (store, dir) = crate::store::testutil::open_temp_store().await;
        let config = crate::config::SyncConfig::builder()
            .server_url("http://127.0.0.1:1".to_string())
            .build()
            .unwrap();
        let engine = SyncEngine::new(
            Arc::new(store),
            Arc::new(RemoteStore::new(Arc::new(config))),
        );
        (engine, dir)
    }

    #[tokio::test]
    async fn test_in_flight_guard_is_per_user() {
        let (engine, _dir) = test_engine().await;

        let first = engine.try_begin("u1").expect("slot free");
        assert!(engine.try_begin("u1").is_none());
        assert!(engine.try_begin("u2").is_some());

        drop(first);
        assert!(engine.try_begin("u1").is_some());
    }

    #[tokio::test]
    async fn test_status_defaults() {
        let (engine, _dir) = test_engine().await;

        let status = engine.status().await;
        assert!(!status.syncing);
        assert!(status.last_sync.is_none());
        assert_eq!(status.pending_operations, 0);
    }
}
