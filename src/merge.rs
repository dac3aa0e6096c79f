//! Conflict resolution for progress snapshots.
//!
//! The merge is a pure function applied field-wise, regardless of which side
//! wrote last:
//!
//! - `completed_topics` - set union; a topic completed on any device stays
//!   completed everywhere
//! - `xp_total` - max of the two totals; never double-counts and never
//!   decreases (XP earned concurrently on two devices between syncs is
//!   under-counted, the accepted tradeoff of max-merge over additive merge)
//! - `streak_count` - max
//! - `streak_last_date` - the later date; a sole non-null date wins
//!
//! The policy is commutative and idempotent, which the property tests lean
//! on. Write timestamps play no part here; last-write-wins applies only to
//! profile scalar fields, handled by the orchestrator.

use crate::types::{ProgressSnapshot, RemoteProgressRecord};

/// Merge a local snapshot with the remote record's progress fields.
pub fn merge_progress(local: &ProgressSnapshot, remote: &RemoteProgressRecord) -> ProgressSnapshot {
    merge_snapshots(local, &remote.snapshot())
}

/// Field-wise merge of two snapshots.
pub fn merge_snapshots(a: &ProgressSnapshot, b: &ProgressSnapshot) -> ProgressSnapshot {
    ProgressSnapshot {
        completed_topics: a
            .completed_topics
            .union(&b.completed_topics)
            .cloned()
            .collect(),
        xp_total: a.xp_total.max(b.xp_total),
        streak_count: a.streak_count.max(b.streak_count),
        streak_last_date: match (a.streak_last_date, b.streak_last_date) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (date, None) => date,
            (None, date) => date,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(topics: &[&str], xp: u64, streak: u32, date: Option<&str>) -> ProgressSnapshot {
        ProgressSnapshot {
            completed_topics: topics.iter().map(|s| s.to_string()).collect(),
            xp_total: xp,
            streak_count: streak,
            streak_last_date: date.map(|d| d.parse::<NaiveDate>().unwrap()),
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let s = snapshot(&["a", "b"], 40, 2, Some("2026-02-01"));
        assert_eq!(merge_snapshots(&s, &s), s);
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = snapshot(&["a"], 10, 1, Some("2026-02-01"));
        let b = snapshot(&["b"], 25, 3, Some("2026-01-20"));
        assert_eq!(merge_snapshots(&a, &b), merge_snapshots(&b, &a));
    }

    #[test]
    fn test_merge_unions_topics_and_takes_max_xp() {
        let a = snapshot(&["a"], 10, 0, None);
        let b = snapshot(&["b"], 25, 0, None);

        let merged = merge_snapshots(&a, &b);
        assert_eq!(merged.completed_topics.len(), 2);
        assert!(merged.completed_topics.contains("a"));
        assert!(merged.completed_topics.contains("b"));
        assert_eq!(merged.xp_total, 25);
    }

    #[test]
    fn test_merge_later_date_wins() {
        let a = snapshot(&[], 0, 1, Some("2026-02-01"));
        let b = snapshot(&[], 0, 1, Some("2026-02-03"));

        let merged = merge_snapshots(&a, &b);
        assert_eq!(merged.streak_last_date, "2026-02-03".parse().ok());
    }

    #[test]
    fn test_merge_sole_date_wins_over_null() {
        let a = snapshot(&[], 0, 0, None);
        let b = snapshot(&[], 0, 1, Some("2026-02-03"));

        assert_eq!(
            merge_snapshots(&a, &b).streak_last_date,
            "2026-02-03".parse().ok()
        );
        assert_eq!(
            merge_snapshots(&b, &a).streak_last_date,
            "2026-02-03".parse().ok()
        );
    }
}
