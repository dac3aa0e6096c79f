//! Streak tracking in the fixed reference timezone.
//!
//! "Today" is computed in Europe/Istanbul (UTC+3, no DST since 2016),
//! independent of device locale, so a streak cannot be gamed by changing
//! the device timezone.
//!
//! Decay is lazy: a missed day is observed on the next read via
//! [`LocalStore::streak_state`], not by a background timer. The stored
//! record keeps its last date so the history of when activity last happened
//! survives the reset.

use chrono::{Duration, FixedOffset, NaiveDate, Utc};

use crate::error::SyncError;
use crate::store::{keys, LocalStore};
use crate::types::{ProgressSnapshot, StreakState};

const REFERENCE_TZ_OFFSET_SECS: i32 = 3 * 3600;

/// Today's calendar date in the reference timezone.
fn reference_today() -> NaiveDate {
    let offset =
        FixedOffset::east_opt(REFERENCE_TZ_OFFSET_SECS).expect("static UTC+3 offset is valid");
    Utc::now().with_timezone(&offset).date_naive()
}

impl LocalStore {
    /// Record learning activity for today.
    ///
    /// Same-day repeats are a no-op; activity exactly one day after the
    /// stored date extends the streak; any larger gap (or no prior date)
    /// starts a new streak of 1.
    pub async fn record_activity(&self, user_id: &str) -> Result<ProgressSnapshot, SyncError> {
        self.record_activity_on(user_id, reference_today()).await
    }

    /// [`record_activity`](Self::record_activity) against an explicit date.
    pub async fn record_activity_on(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<ProgressSnapshot, SyncError> {
        let current: StreakState = self
            .read_value(&keys::streak(user_id))
            .await
            .unwrap_or_default();

        let next = match current.last_date {
            Some(last) if last == today => {
                return Ok(self.progress(user_id).await);
            }
            Some(last) if today - last == Duration::days(1) => StreakState {
                count: current.count + 1,
                last_date: Some(today),
            },
            _ => StreakState {
                count: 1,
                last_date: Some(today),
            },
        };

        self.write_value(&keys::streak(user_id), &next).await?;
        tracing::debug!(user_id, count = next.count, "recorded streak activity");

        let newly = self.refresh_unlocks(user_id).await?;
        if !newly.is_empty() {
            tracing::info!(user_id, unlocked = ?newly, "streak threshold unlocked avatars");
        }

        Ok(self.progress(user_id).await)
    }

    /// Read the streak as the user should see it right now.
    ///
    /// If more than one full day has passed since the last activity the
    /// observed count is 0; the stored record is left untouched.
    pub async fn streak_state(&self, user_id: &str) -> StreakState {
        self.streak_state_on(user_id, reference_today()).await
    }

    /// [`streak_state`](Self::streak_state) against an explicit date.
    pub async fn streak_state_on(&self, user_id: &str, today: NaiveDate) -> StreakState {
        let stored: StreakState = self
            .read_value(&keys::streak(user_id))
            .await
            .unwrap_or_default();

        match stored.last_date {
            Some(last) if today - last > Duration::days(1) => StreakState {
                count: 0,
                last_date: stored.last_date,
            },
            _ => stored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::open_temp_store;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_first_activity_starts_streak() {
        let (store, _dir) = open_temp_store().await;

        let snapshot = store.record_activity_on("u1", day("2026-03-10")).await.unwrap();
        assert_eq!(snapshot.streak_count, 1);
        assert_eq!(snapshot.streak_last_date, Some(day("2026-03-10")));
    }

    #[tokio::test]
    async fn test_same_day_repeat_is_noop() {
        let (store, _dir) = open_temp_store().await;

        store.record_activity_on("u1", day("2026-03-10")).await.unwrap();
        let snapshot = store.record_activity_on("u1", day("2026-03-10")).await.unwrap();
        assert_eq!(snapshot.streak_count, 1);
    }

    #[tokio::test]
    async fn test_consecutive_day_increments() {
        let (store, _dir) = open_temp_store().await;

        store.record_activity_on("u1", day("2026-03-10")).await.unwrap();
        let snapshot = store.record_activity_on("u1", day("2026-03-11")).await.unwrap();
        assert_eq!(snapshot.streak_count, 2);
        assert_eq!(snapshot.streak_last_date, Some(day("2026-03-11")));
    }

    #[tokio::test]
    async fn test_gap_resets_to_one() {
        let (store, _dir) = open_temp_store().await;

        store.record_activity_on("u1", day("2026-03-10")).await.unwrap();
        store.record_activity_on("u1", day("2026-03-11")).await.unwrap();
        let snapshot = store.record_activity_on("u1", day("2026-03-14")).await.unwrap();
        assert_eq!(snapshot.streak_count, 1);
        assert_eq!(snapshot.streak_last_date, Some(day("2026-03-14")));
    }

    #[tokio::test]
    async fn test_streak_reads_unchanged_next_day() {
        let (store, _dir) = open_temp_store().await;

        store.record_activity_on("u1", day("2026-03-10")).await.unwrap();
        store.record_activity_on("u1", day("2026-03-11")).await.unwrap();

        let state = store.streak_state_on("u1", day("2026-03-12")).await;
        assert_eq!(state.count, 2);
    }

    #[tokio::test]
    async fn test_streak_decays_after_two_days() {
        let (store, _dir) = open_temp_store().await;

        store.record_activity_on("u1", day("2026-03-10")).await.unwrap();
        store.record_activity_on("u1", day("2026-03-11")).await.unwrap();

        let state = store.streak_state_on("u1", day("2026-03-13")).await;
        assert_eq!(state.count, 0);
        // Stored date survives the observed reset.
        assert_eq!(state.last_date, Some(day("2026-03-11")));

        // Decay is observed, not persisted.
        let stored = store.progress("u1").await;
        assert_eq!(stored.streak_count, 2);
    }
}
