//! Lexio Sync - Offline-First Progress Synchronization
//!
//! `lexio-sync` keeps a Lexio user's learning progress (completed topics, XP
//! total, daily streak) and profile consistent between a local on-device
//! cache and the remote authoritative store, across unreliable connectivity,
//! multiple devices, and process restarts.
//!
//! # Overview
//!
//! Local writes are synchronous and authoritative for the UI; the remote
//! store is reconciled in the background. Every sync runs the same
//! pull-merge-push cycle, so transient failures self-heal on the next
//! attempt without replaying partial state.
//!
//! # Module Structure
//!
//! - **`store`** - Local state stores backed by SQLite
//!   - Per-user progress, profile, unlocked rewards, theme preference
//!   - Durable retry queue that survives process restarts
//!
//! - **`remote`** - Adapter over the remote per-user key-value store
//!   - Fetch/upsert of progress and profile records
//!   - Distinguishes not-found from network and permission failures
//!
//! - **`merge`** - Pure conflict resolution for progress snapshots
//!
//! - **`sync`** - Orchestration
//!   - `SyncEngine`: pull-merge-push cycle with an in-flight guard
//!   - `ConnectivityMonitor`: passive signal plus active probe
//!   - `SyncScheduler`: startup, periodic, foreground, and reconnect triggers
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lexio_sync::{
//!     ConnectivityMonitor, LocalStore, RemoteStore, SyncConfig, SyncEngine, SyncScheduler,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(
//!         SyncConfig::builder()
//!             .server_url("https://api.lexio.app".to_string())
//!             .token("session-token".to_string())
//!             .build()?,
//!     );
//!
//!     let store = Arc::new(LocalStore::open(config.db_path()).await?);
//!     let remote = Arc::new(RemoteStore::new(Arc::clone(&config)));
//!     let engine = Arc::new(SyncEngine::new(Arc::clone(&store), Arc::clone(&remote)));
//!
//!     let monitor = ConnectivityMonitor::new(Arc::clone(&remote), config.probe_interval);
//!     monitor.start();
//!
//!     let mut scheduler =
//!         SyncScheduler::new(Arc::clone(&engine), Arc::clone(&monitor), &config, "user-1");
//!     scheduler.start();
//!
//!     // Manual pull-to-refresh entry point; concurrent triggers are dropped
//!     // by the in-flight guard.
//!     engine.perform_sync("user-1").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod merge;
pub mod remote;
pub mod rewards;
pub mod store;
pub mod sync;
pub mod types;

pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use error::SyncError;
pub use merge::{merge_progress, merge_snapshots};
pub use remote::RemoteStore;
pub use store::LocalStore;
pub use sync::monitor::ConnectivityMonitor;
pub use sync::scheduler::{AppLifecycleEvent, SyncScheduler};
pub use sync::{SyncEngine, SyncOutcome, SyncStatus};
pub use types::{
    AvatarId, LocalProfile, ProgressSnapshot, RemoteProfileRecord, RemoteProgressRecord,
    StreakState, SyncKind, SyncOperation, ThemePreference,
};
