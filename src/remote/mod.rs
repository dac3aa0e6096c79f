//! # Remote Store Adapter
//!
//! HTTP client over the remote authoritative store: one progress record and
//! one profile record per user, keyed by user id, upserted whole. The
//! server assigns `updated_at` on every write.
//!
//! ## Error surface
//!
//! - absence is a valid state, surfaced as `Ok(None)` on fetch, never as an
//!   error
//! - connect/timeout/transport failures map to [`SyncError::Network`]
//! - 401/403 map to [`SyncError::Permission`]
//! - any other non-success status maps to [`SyncError::Remote`] with the
//!   status and body in the message

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::types::{AvatarId, LocalProfile, ProgressSnapshot, RemoteProfileRecord, RemoteProgressRecord};

/// Upsert body for the progress record; `updated_at` is server-assigned.
#[derive(Debug, Serialize)]
struct ProgressUpsert {
    completed_subtopics: Vec<String>,
    xp_total: u64,
    streak_count: u32,
    streak_last_date: Option<chrono::NaiveDate>,
    last_synced_at: chrono::DateTime<Utc>,
}

/// Upsert body for the profile record.
#[derive(Debug, Serialize)]
struct ProfileUpsert {
    name: String,
    avatar_url: Option<String>,
    unlocked_avatars: Vec<String>,
}

/// Client for the remote per-user key-value store.
#[derive(Debug)]
pub struct RemoteStore {
    client: Client,
    config: Arc<SyncConfig>,
}

impl RemoteStore {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn progress_url(&self, user_id: &str) -> String {
        self.config.api_url(&format!("/v1/users/{}/progress", user_id))
    }

    fn profile_url(&self, user_id: &str) -> String {
        self.config.api_url(&format!("/v1/users/{}/profile", user_id))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch a user's progress record; `Ok(None)` when none exists yet.
    pub async fn fetch_progress(
        &self,
        user_id: &str,
    ) -> Result<Option<RemoteProgressRecord>, SyncError> {
        let response = self
            .authorize(self.client.get(self.progress_url(user_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }

    /// Upsert a user's progress record; returns the stored record with the
    /// server-assigned `updated_at`.
    pub async fn upsert_progress(
        &self,
        user_id: &str,
        snapshot: &ProgressSnapshot,
    ) -> Result<RemoteProgressRecord, SyncError> {
        let body = ProgressUpsert {
            completed_subtopics: snapshot.completed_topics.iter().cloned().collect(),
            xp_total: snapshot.xp_total,
            streak_count: snapshot.streak_count,
            streak_last_date: snapshot.streak_last_date,
            last_synced_at: Utc::now(),
        };

        let response = self
            .authorize(self.client.put(self.progress_url(user_id)))
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch a user's profile record; `Ok(None)` when none exists yet.
    pub async fn fetch_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<RemoteProfileRecord>, SyncError> {
        let response = self
            .authorize(self.client.get(self.profile_url(user_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }

    /// Upsert a user's profile record.
    pub async fn upsert_profile(
        &self,
        user_id: &str,
        profile: &LocalProfile,
        unlocked: &BTreeSet<AvatarId>,
    ) -> Result<RemoteProfileRecord, SyncError> {
        let body = ProfileUpsert {
            name: profile.name.clone(),
            avatar_url: profile.avatar_id.map(AvatarId::as_wire),
            unlocked_avatars: unlocked.iter().map(|id| id.as_wire()).collect(),
        };

        let response = self
            .authorize(self.client.put(self.profile_url(user_id)))
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Lightweight authenticated round-trip used by the connectivity
    /// monitor. Any HTTP response at all means the network is reachable;
    /// classification is the monitor's job.
    pub async fn probe(&self) -> Result<(), SyncError> {
        let response = self
            .authorize(self.client.get(self.config.api_url("/v1/ping")))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Map a non-success response into the error taxonomy.
async fn check_status(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(SyncError::permission(format!("{} - {}", status, body)))
        }
        _ => Err(SyncError::remote(format!("{} - {}", status, body))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_for(url: &str) -> RemoteStore {
        let config = SyncConfig::builder()
            .server_url(url.to_string())
            .token("test-token".to_string())
            .build()
            .unwrap();
        RemoteStore::new(Arc::new(config))
    }

    #[test]
    fn test_record_urls() {
        let remote = remote_for("https://api.example.test");
        assert_eq!(
            remote.progress_url("u1"),
            "https://api.example.test/v1/users/u1/progress"
        );
        assert_eq!(
            remote.profile_url("u1"),
            "https://api.example.test/v1/users/u1/profile"
        );
    }

    #[test]
    fn test_progress_upsert_wire_shape() {
        let mut snapshot = ProgressSnapshot::default();
        snapshot.completed_topics.insert("greetings".to_string());
        snapshot.xp_total = 10;

        let body = ProgressUpsert {
            completed_subtopics: snapshot.completed_topics.iter().cloned().collect(),
            xp_total: snapshot.xp_total,
            streak_count: snapshot.streak_count,
            streak_last_date: snapshot.streak_last_date,
            last_synced_at: Utc::now(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["completed_subtopics"][0], "greetings");
        assert_eq!(json["xp_total"], 10);
        assert_eq!(json["streak_last_date"], serde_json::Value::Null);
    }
}
