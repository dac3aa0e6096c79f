//! # Durable Retry Queue
//!
//! Append-only list of pending sync operations, persisted before `enqueue`
//! returns so entries survive process restarts.
//!
//! The queue is deliberately dumb: it does not deduplicate by kind, and a
//! stored payload is informational only. Draining an entry re-runs a full
//! pull-merge-push cycle rather than replaying the stored operation, so any
//! number of queued entries for a user collapse into one successful sync.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::error::SyncError;
use crate::store::LocalStore;
use crate::types::{SyncKind, SyncOperation};

impl LocalStore {
    /// Append an operation to the retry queue.
    ///
    /// The entry is durable when this returns.
    pub async fn enqueue(
        &self,
        kind: SyncKind,
        user_id: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<SyncOperation, SyncError> {
        let operation = SyncOperation {
            id: Uuid::new_v4().to_string(),
            kind,
            user_id: user_id.to_string(),
            enqueued_at: Utc::now(),
            payload,
        };

        let payload_json = operation
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO sync_queue (id, user_id, kind, payload, enqueued_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&operation.id)
        .bind(&operation.user_id)
        .bind(operation.kind.as_str())
        .bind(payload_json)
        .bind(operation.enqueued_at.to_rfc3339())
        .execute(self.pool())
        .await?;

        tracing::debug!(user_id, kind = kind.as_str(), id = %operation.id, "enqueued sync retry");
        Ok(operation)
    }

    /// Pending operations for a user, in insertion order.
    ///
    /// Malformed rows are skipped; database errors read as an empty queue.
    pub async fn queue_for_user(&self, user_id: &str) -> Vec<SyncOperation> {
        let rows = match sqlx::query(
            "SELECT id, user_id, kind, payload, enqueued_at
             FROM sync_queue
             WHERE user_id = ?
             ORDER BY enqueued_at ASC, rowid ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "failed to read sync queue");
                return Vec::new();
            }
        };

        let mut operations = Vec::new();
        for row in rows {
            let Some(operation) = Self::operation_from_row(&row) else {
                continue;
            };
            operations.push(operation);
        }
        operations
    }

    fn operation_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<SyncOperation> {
        let id: String = row.try_get("id").ok()?;
        let user_id: String = row.try_get("user_id").ok()?;
        let kind_raw: String = row.try_get("kind").ok()?;
        let kind = SyncKind::from_str(&kind_raw)?;

        let enqueued_raw: String = row.try_get("enqueued_at").ok()?;
        let enqueued_at = DateTime::parse_from_rfc3339(&enqueued_raw)
            .ok()?
            .with_timezone(&Utc);

        let payload = row
            .try_get::<Option<String>, _>("payload")
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok());

        Some(SyncOperation {
            id,
            kind,
            user_id,
            enqueued_at,
            payload,
        })
    }

    /// Remove operations by id; unknown ids are a no-op.
    pub async fn remove_operations(&self, ids: &[String]) -> Result<(), SyncError> {
        for id in ids {
            sqlx::query("DELETE FROM sync_queue WHERE id = ?")
                .bind(id)
                .execute(self.pool())
                .await?;
        }
        Ok(())
    }

    /// Drop every queued operation for a user. Called on logout.
    pub async fn clear_queue_for_user(&self, user_id: &str) -> Result<(), SyncError> {
        sqlx::query("DELETE FROM sync_queue WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
