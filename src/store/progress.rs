//! Progress snapshot operations: completed topics and XP.

use crate::error::SyncError;
use crate::store::{keys, LocalStore};
use crate::types::{ProgressSnapshot, StreakState};

impl LocalStore {
    /// Read a user's progress snapshot.
    ///
    /// Never fails: each absent or corrupted field reads as its zero value.
    pub async fn progress(&self, user_id: &str) -> ProgressSnapshot {
        let completed = self
            .read_value(&keys::completed(user_id))
            .await
            .unwrap_or_default();
        let xp_total = self.read_value(&keys::xp(user_id)).await.unwrap_or_default();
        let streak: StreakState = self
            .read_value(&keys::streak(user_id))
            .await
            .unwrap_or_default();

        ProgressSnapshot {
            completed_topics: completed,
            xp_total,
            streak_count: streak.count,
            streak_last_date: streak.last_date,
        }
    }

    /// Persist a full snapshot, field by field.
    ///
    /// Used by the reconciliation step; gameplay events go through the
    /// per-field operations instead.
    pub async fn write_progress(
        &self,
        user_id: &str,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), SyncError> {
        self.write_value(&keys::completed(user_id), &snapshot.completed_topics)
            .await?;
        self.write_value(&keys::xp(user_id), &snapshot.xp_total)
            .await?;
        self.write_value(
            &keys::streak(user_id),
            &StreakState {
                count: snapshot.streak_count,
                last_date: snapshot.streak_last_date,
            },
        )
        .await?;
        Ok(())
    }

    /// Add XP to a user's total.
    ///
    /// Non-finite and non-positive amounts are a no-op returning the
    /// unchanged state; otherwise the amount is rounded to the nearest
    /// integer. There is no decrement operation: the total never goes down.
    pub async fn add_xp(&self, user_id: &str, amount: f64) -> Result<ProgressSnapshot, SyncError> {
        if !amount.is_finite() || amount <= 0.0 {
            tracing::debug!(user_id, amount, "ignoring invalid xp amount");
            return Ok(self.progress(user_id).await);
        }

        let current: u64 = self.read_value(&keys::xp(user_id)).await.unwrap_or_default();
        let total = current.saturating_add(amount.round() as u64);
        self.write_value(&keys::xp(user_id), &total).await?;

        let newly = self.refresh_unlocks(user_id).await?;
        if !newly.is_empty() {
            tracing::info!(user_id, unlocked = ?newly, "xp threshold unlocked avatars");
        }

        Ok(self.progress(user_id).await)
    }

    /// Mark a topic as completed.
    ///
    /// Idempotent: returns `false` when the topic was already present, so
    /// callers can avoid awarding XP twice for the same completion.
    pub async fn mark_completed(&self, user_id: &str, slug: &str) -> Result<bool, SyncError> {
        let mut completed: std::collections::BTreeSet<String> = self
            .read_value(&keys::completed(user_id))
            .await
            .unwrap_or_default();

        if !completed.insert(slug.to_string()) {
            return Ok(false);
        }

        self.write_value(&keys::completed(user_id), &completed)
            .await?;
        Ok(true)
    }
}
