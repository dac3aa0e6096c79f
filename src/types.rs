//! Core data model for progress synchronization.
//!
//! A [`ProgressSnapshot`] is the full value of a user's progress at one point
//! in time. The remote store holds the same fields under their wire names
//! plus server-assigned timestamps ([`RemoteProgressRecord`]). Profile data
//! is a separate record with last-write-wins semantics on its scalar fields.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A user's learning progress at one point in time.
///
/// Created implicitly as the zero value on first launch, mutated by gameplay
/// events and by reconciliation, never explicitly deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Slugs of completed topics; only ever grows
    pub completed_topics: BTreeSet<String>,
    /// Total XP earned; monotonically non-decreasing on this device
    pub xp_total: u64,
    /// Consecutive active days ending at `streak_last_date`
    pub streak_count: u32,
    /// Most recent date activity was recorded, in the reference timezone
    pub streak_last_date: Option<NaiveDate>,
}

/// The remote store's progress record for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProgressRecord {
    /// Completed topic slugs under their wire name
    pub completed_subtopics: Vec<String>,
    pub xp_total: u64,
    pub streak_count: u32,
    pub streak_last_date: Option<NaiveDate>,
    /// Server-assigned write timestamp, monotonic per write
    pub updated_at: DateTime<Utc>,
    /// Client-reported timestamp of the last successful sync
    pub last_synced_at: DateTime<Utc>,
}

impl RemoteProgressRecord {
    /// The progress fields of this record as a snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed_topics: self.completed_subtopics.iter().cloned().collect(),
            xp_total: self.xp_total,
            streak_count: self.streak_count,
            streak_last_date: self.streak_last_date,
        }
    }
}

/// Streak state as stored locally, one entry per user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub count: u32,
    pub last_date: Option<NaiveDate>,
}

/// Identifier for one of the five avatar images in the fixed wardrobe.
///
/// Invalid identifiers coming off the wire are dropped rather than surfaced
/// as errors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct AvatarId(u8);

impl AvatarId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create an avatar id, returning `None` outside `1..=5`.
    pub fn new(id: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&id).then_some(Self(id))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Wire representation: the numeric id as a string, carried in the
    /// remote profile's `avatar_url` field.
    pub fn as_wire(self) -> String {
        self.0.to_string()
    }

    /// Parse the wire representation; unknown values map to `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        value.trim().parse::<u8>().ok().and_then(Self::new)
    }
}

impl TryFrom<u8> for AvatarId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("avatar id out of range: {}", value))
    }
}

impl From<AvatarId> for u8 {
    fn from(id: AvatarId) -> Self {
        id.0
    }
}

/// A user's profile as stored locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalProfile {
    pub name: String,
    pub avatar_id: Option<AvatarId>,
    /// Local write timestamp, compared against the remote record's
    /// `updated_at` for last-write-wins profile sync
    pub updated_at: Option<DateTime<Utc>>,
}

/// The remote store's profile record for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProfileRecord {
    pub name: String,
    /// Repurposed to store the avatar identifier, not a URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub unlocked_avatars: Vec<String>,
    /// Server-assigned write timestamp
    pub updated_at: DateTime<Utc>,
}

impl RemoteProfileRecord {
    /// The avatar id carried in `avatar_url`, if present and valid.
    pub fn avatar_id(&self) -> Option<AvatarId> {
        self.avatar_url.as_deref().and_then(AvatarId::from_wire)
    }

    /// The unlocked avatar set, dropping unknown identifiers.
    pub fn unlocked_ids(&self) -> BTreeSet<AvatarId> {
        self.unlocked_avatars
            .iter()
            .filter_map(|v| AvatarId::from_wire(v))
            .collect()
    }
}

/// Which logical record a queued sync operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Progress,
    Profile,
}

impl SyncKind {
    /// Stable name used for database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Profile => "profile",
        }
    }

    /// Parse the stored name; unknown names map to `None`.
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "progress" => Some(Self::Progress),
            "profile" => Some(Self::Profile),
            _ => None,
        }
    }
}

/// A pending entry in the durable retry queue.
///
/// The queue is a signal to retry a full sync, not a diff: `payload` is
/// informational only and is never replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    /// Opaque unique id
    pub id: String,
    pub kind: SyncKind,
    pub user_id: String,
    pub enqueued_at: DateTime<Utc>,
    pub payload: Option<serde_json::Value>,
}

/// Local-only display preference, persisted alongside sync state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_id_range() {
        assert!(AvatarId::new(0).is_none());
        assert!(AvatarId::new(1).is_some());
        assert!(AvatarId::new(5).is_some());
        assert!(AvatarId::new(6).is_none());
    }

    #[test]
    fn test_avatar_id_wire_round_trip() {
        let id = AvatarId::new(4).unwrap();
        assert_eq!(id.as_wire(), "4");
        assert_eq!(AvatarId::from_wire("4"), Some(id));
        assert_eq!(AvatarId::from_wire("banana"), None);
        assert_eq!(AvatarId::from_wire("9"), None);
    }

    #[test]
    fn test_sync_kind_names() {
        assert_eq!(SyncKind::Progress.as_str(), "progress");
        assert_eq!(SyncKind::from_str("profile"), Some(SyncKind::Profile));
        assert_eq!(SyncKind::from_str("unknown"), None);
    }

    #[test]
    fn test_remote_record_snapshot() {
        let record = RemoteProgressRecord {
            completed_subtopics: vec!["b".to_string(), "a".to_string(), "a".to_string()],
            xp_total: 120,
            streak_count: 4,
            streak_last_date: NaiveDate::from_ymd_opt(2026, 3, 14),
            updated_at: Utc::now(),
            last_synced_at: Utc::now(),
        };

        let snapshot = record.snapshot();
        assert_eq!(snapshot.completed_topics.len(), 2);
        assert_eq!(snapshot.xp_total, 120);
        assert_eq!(snapshot.streak_count, 4);
    }

    #[test]
    fn test_remote_profile_drops_invalid_avatars() {
        let record = RemoteProfileRecord {
            name: "Deniz".to_string(),
            avatar_url: Some("3".to_string()),
            unlocked_avatars: vec!["1".to_string(), "7".to_string(), "2".to_string()],
            updated_at: Utc::now(),
        };

        assert_eq!(record.avatar_id(), AvatarId::new(3));
        let unlocked = record.unlocked_ids();
        assert_eq!(unlocked.len(), 2);
    }

    #[test]
    fn test_progress_snapshot_json_shape() {
        let snapshot = ProgressSnapshot {
            completed_topics: ["greetings".to_string()].into_iter().collect(),
            xp_total: 10,
            streak_count: 1,
            streak_last_date: NaiveDate::from_ymd_opt(2026, 1, 2),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["streak_last_date"], "2026-01-02");
        let back: ProgressSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
