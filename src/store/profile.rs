//! Profile fields, unlocked avatars, and theme preference.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::error::SyncError;
use crate::rewards;
use crate::store::{keys, LocalStore};
use crate::types::{AvatarId, LocalProfile, ThemePreference};

impl LocalStore {
    /// Read a user's profile; absent or corrupted data reads as the default.
    pub async fn profile(&self, user_id: &str) -> LocalProfile {
        self.read_value(&keys::profile(user_id))
            .await
            .unwrap_or_default()
    }

    /// Persist a profile as-is, without stamping a new write timestamp.
    ///
    /// Used by the reconciliation step when adopting a remote profile; user
    /// edits go through [`set_name`](Self::set_name) and
    /// [`set_avatar`](Self::set_avatar).
    pub async fn write_profile(
        &self,
        user_id: &str,
        profile: &LocalProfile,
    ) -> Result<(), SyncError> {
        self.write_value(&keys::profile(user_id), profile).await
    }

    /// Set the display name, stamping the local write timestamp.
    pub async fn set_name(&self, user_id: &str, name: &str) -> Result<LocalProfile, SyncError> {
        let mut profile = self.profile(user_id).await;
        profile.name = name.to_string();
        profile.updated_at = Some(Utc::now());
        self.write_profile(user_id, &profile).await?;
        Ok(profile)
    }

    /// Set the avatar, rejecting avatars the user has not unlocked.
    pub async fn set_avatar(
        &self,
        user_id: &str,
        avatar: AvatarId,
    ) -> Result<LocalProfile, SyncError> {
        if !self.unlocked_avatars(user_id).await.contains(&avatar) {
            return Err(SyncError::validation(
                "avatar_id",
                format!("avatar {} is not unlocked", avatar.get()),
            ));
        }

        let mut profile = self.profile(user_id).await;
        profile.avatar_id = Some(avatar);
        profile.updated_at = Some(Utc::now());
        self.write_profile(user_id, &profile).await?;
        Ok(profile)
    }

    /// The user's unlocked avatar set. Defaults to the base wardrobe.
    pub async fn unlocked_avatars(&self, user_id: &str) -> BTreeSet<AvatarId> {
        match self.read_value(&keys::avatars(user_id)).await {
            Some(unlocked) => unlocked,
            None => rewards::eligible_avatars(&Default::default()),
        }
    }

    /// Re-evaluate unlock thresholds against the current progress.
    ///
    /// The unlocked set is monotonic: this only ever adds. Returns the newly
    /// unlocked avatars.
    pub async fn refresh_unlocks(&self, user_id: &str) -> Result<Vec<AvatarId>, SyncError> {
        let current = self.unlocked_avatars(user_id).await;
        let snapshot = self.progress(user_id).await;
        let eligible = rewards::eligible_avatars(&snapshot);

        let newly: Vec<AvatarId> = eligible.difference(&current).copied().collect();
        if newly.is_empty() {
            return Ok(newly);
        }

        let merged: BTreeSet<AvatarId> = current.union(&eligible).copied().collect();
        self.write_value(&keys::avatars(user_id), &merged).await?;
        Ok(newly)
    }

    /// Union avatars unlocked elsewhere (another device) into the local set.
    pub async fn merge_unlocked(
        &self,
        user_id: &str,
        remote: &BTreeSet<AvatarId>,
    ) -> Result<(), SyncError> {
        let current = self.unlocked_avatars(user_id).await;
        if remote.is_subset(&current) {
            return Ok(());
        }
        let merged: BTreeSet<AvatarId> = current.union(remote).copied().collect();
        self.write_value(&keys::avatars(user_id), &merged).await
    }

    /// Read the theme preference.
    pub async fn theme(&self) -> ThemePreference {
        self.read_value(keys::THEME).await.unwrap_or_default()
    }

    /// Persist the theme preference.
    pub async fn set_theme(&self, theme: ThemePreference) -> Result<(), SyncError> {
        self.write_value(keys::THEME, &theme).await
    }
}
