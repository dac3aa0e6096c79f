//! Shared helpers for integration tests.
//!
//! Provides a harness wiring a temp-directory local store and a wiremock
//! remote store into a sync engine, plus builders for remote record JSON.

#![allow(dead_code)]

use std::sync::Arc;

use lexio_sync::{LocalStore, RemoteStore, SyncConfig, SyncEngine};
use serde_json::json;
use tempfile::TempDir;
use wiremock::MockServer;

pub struct TestHarness {
    pub server: MockServer,
    pub store: Arc<LocalStore>,
    pub engine: Arc<SyncEngine>,
    /// Keeps the database directory alive for the harness lifetime
    pub dir: TempDir,
}

/// Engine wired to a fresh local store and a mock remote server.
pub async fn harness() -> TestHarness {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("create temp dir");
    let store = Arc::new(
        LocalStore::open(dir.path().join("sync.db"))
            .await
            .expect("open local store"),
    );

    let config = Arc::new(
        SyncConfig::builder()
            .server_url(server.uri())
            .token("test-token".to_string())
            .build()
            .expect("build config"),
    );
    let remote = Arc::new(RemoteStore::new(config));
    let engine = Arc::new(SyncEngine::new(Arc::clone(&store), remote));

    TestHarness {
        server,
        store,
        engine,
        dir,
    }
}

/// Engine pointed at a port nothing listens on.
pub async fn offline_harness() -> (Arc<LocalStore>, Arc<SyncEngine>, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let store = Arc::new(
        LocalStore::open(dir.path().join("sync.db"))
            .await
            .expect("open local store"),
    );

    let config = Arc::new(
        SyncConfig::builder()
            .server_url("http://127.0.0.1:1".to_string())
            .build()
            .expect("build config"),
    );
    let remote = Arc::new(RemoteStore::new(config));
    let engine = Arc::new(SyncEngine::new(Arc::clone(&store), remote));

    (store, engine, dir)
}

/// Remote progress record JSON as the server would return it.
pub fn progress_record(
    topics: &[&str],
    xp: u64,
    streak: u32,
    last_date: Option<&str>,
    updated_at: &str,
) -> serde_json::Value {
    json!({
        "completed_subtopics": topics,
        "xp_total": xp,
        "streak_count": streak,
        "streak_last_date": last_date,
        "updated_at": updated_at,
        "last_synced_at": updated_at,
    })
}

/// Remote profile record JSON as the server would return it.
pub fn profile_record(
    name: &str,
    avatar: Option<&str>,
    unlocked: &[&str],
    updated_at: &str,
) -> serde_json::Value {
    json!({
        "name": name,
        "avatar_url": avatar,
        "unlocked_avatars": unlocked,
        "updated_at": updated_at,
    })
}
