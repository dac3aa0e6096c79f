//! Avatar unlock thresholds.
//!
//! The wardrobe is a fixed set of five avatar images. The first three are
//! available to everyone; the last two are earned. Unlocking is monotonic:
//! once a threshold is crossed the avatar stays unlocked even if the streak
//! later decays.

use std::collections::BTreeSet;

use crate::types::{AvatarId, ProgressSnapshot};

/// XP total required to unlock avatar 4
pub const XP_AVATAR_THRESHOLD: u64 = 1000;

/// Streak length required to unlock avatar 5
pub const STREAK_AVATAR_THRESHOLD: u32 = 3;

/// Avatars this snapshot qualifies for.
pub fn eligible_avatars(snapshot: &ProgressSnapshot) -> BTreeSet<AvatarId> {
    let mut eligible: BTreeSet<AvatarId> = (1..=3).filter_map(AvatarId::new).collect();
    if snapshot.xp_total >= XP_AVATAR_THRESHOLD {
        eligible.extend(AvatarId::new(4));
    }
    if snapshot.streak_count >= STREAK_AVATAR_THRESHOLD {
        eligible.extend(AvatarId::new(5));
    }
    eligible
}
