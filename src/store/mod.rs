//! # Local State Stores
//!
//! On-device persistence for the sync engine, backed by a single SQLite
//! database. Each concern is stored under its own key per user, as
//! serialized JSON; the durable retry queue has its own table.
//!
//! ## Contract
//!
//! - Reads never fail: absent or malformed persisted data reads as the
//!   zero value, logged but never surfaced to the caller
//! - Writes return `Result`; callers log failures and do not retry them
//!   (no queue backs local writes)
//! - Local state is authoritative for the UI; reconciliation rewrites it
//!   only through the same write operations
//!
//! ## Key Components
//!
//! - `LocalStore`: database connection and key-value plumbing
//! - `progress.rs`: snapshot reads/writes, XP, completed topics
//! - `streak.rs`: streak increments and read-time decay
//! - `profile.rs`: profile fields, unlocked avatars, theme preference
//! - `queue.rs`: the durable retry queue

pub mod profile;
pub mod progress;
pub mod queue;
pub mod streak;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::error::SyncError;

/// Local database connection manager.
///
/// Cheap to clone via the inner pool; all store operations hang off this
/// type.
#[derive(Debug)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open or create the local sync database at `path`.
    ///
    /// Creates the parent directory and the database file if needed and
    /// initializes the schema. Uses WAL mode for better concurrency.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::Storage(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize database schema and run pending migrations.
    async fn init_schema(&self) -> Result<(), SyncError> {
        sqlx::raw_sql(include_str!("schema.sql"))
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let current: (i32,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .unwrap_or((0,));

        if current.0 < 1 {
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?)")
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read a persisted value, treating absence and corruption alike.
    ///
    /// Malformed JSON and database errors read as `None`; both are logged
    /// and neither is surfaced to the caller.
    pub(crate) async fn read_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let row = match sqlx::query("SELECT value FROM local_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row?,
            Err(err) => {
                tracing::warn!(key, error = %err, "local read failed, treating as absent");
                return None;
            }
        };

        let raw: String = match row.try_get("value") {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "local row unreadable, treating as absent");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "malformed persisted value, treating as absent");
                None
            }
        }
    }

    /// Persist a value under `key`, replacing any previous value.
    pub(crate) async fn write_value<T: Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), SyncError> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT OR REPLACE INTO local_state (key, value, updated_at) VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(raw)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Key scheme: one key per user per concern.
pub(crate) mod keys {
    pub fn completed(user_id: &str) -> String {
        format!("completed:{}", user_id)
    }

    pub fn xp(user_id: &str) -> String {
        format!("xp:{}", user_id)
    }

    pub fn streak(user_id: &str) -> String {
        format!("streak:{}", user_id)
    }

    pub fn profile(user_id: &str) -> String {
        format!("profile:{}", user_id)
    }

    pub fn avatars(user_id: &str) -> String {
        format!("avatars:{}", user_id)
    }

    pub const THEME: &str = "theme";
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::LocalStore;
    use tempfile::TempDir;

    /// Open a store in a fresh temp directory. The directory guard must be
    /// kept alive for the store's lifetime.
    pub async fn open_temp_store() -> (LocalStore, TempDir) {
        let dir = TempDir::new().expect("create temp dir");
        let store = LocalStore::open(dir.path().join("sync.db"))
            .await
            .expect("open local store");
        (store, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::open_temp_store;

    #[tokio::test]
    async fn test_read_absent_value() {
        let (store, _dir) = open_temp_store().await;
        let value: Option<u64> = store.read_value("xp:nobody").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_write_then_read_value() {
        let (store, _dir) = open_temp_store().await;
        store.write_value("xp:u1", &42u64).await.unwrap();
        let value: Option<u64> = store.read_value("xp:u1").await;
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn test_malformed_value_reads_as_absent() {
        let (store, _dir) = open_temp_store().await;
        sqlx::query("INSERT INTO local_state (key, value, updated_at) VALUES (?, ?, ?)")
            .bind("xp:u1")
            .bind("{ not json")
            .bind("2026-01-01T00:00:00Z")
            .execute(store.pool())
            .await
            .unwrap();

        let value: Option<u64> = store.read_value("xp:u1").await;
        assert_eq!(value, None);
    }
}
