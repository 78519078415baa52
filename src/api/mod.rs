//! Remote API surface
//!
//! The YouTube data API and the browser identity source are consumed
//! capabilities behind narrow traits; the crate never talks HTTP itself.
//! Implementations return the typed records below and report failures
//! through the [`ApiError`] taxonomy, splitting recoverable authorization
//! failures from fatal request failures.

pub mod error;
#[cfg(test)]
pub mod stub;
pub mod url;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::model::{Account, SubscriptionKind};

pub use error::ApiError;
pub use url::SubscriptionUrl;

/// Attempts granted to an authorization-failing call before giving up.
pub const AUTH_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between authorization retries; grows linearly per attempt.
pub const AUTH_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// A remote channel a subscription points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteChannel {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub uploads_playlist_id: Option<String>,
}

/// A remote playlist, refreshed metadata included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlaylist {
    pub id: String,
    pub channel_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub video_count: u64,
    pub thumbnail: Option<String>,
}

/// A remote video inside an uploads playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVideo {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub view_count: u64,
}

/// The locally known state of a playlist, for change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSnapshot {
    pub id: String,
    pub video_count: u64,
}

/// Resolution of a pasted URL to a subscribable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncognitoResolution {
    pub kind: SubscriptionKind,
    pub resource_id: String,
}

/// The YouTube data API capability.
///
/// Every call may fail with an authorization-class error (recoverable, see
/// module docs) or a request-class error (fatal to the current operation).
#[async_trait]
pub trait YouTubeApi: Send + Sync {
    /// Full account info for the signed-in identity.
    async fn account_info(
        &self,
        account_id: &str,
        channel_id: Option<&str>,
    ) -> Result<Account, ApiError>;

    /// The channels an account subscribes to. Unauthorized reads work for
    /// publicly readable accounts; `authorized` requests use credentials.
    async fn subscriptions(
        &self,
        account_id: &str,
        authorized: bool,
    ) -> Result<Vec<RemoteChannel>, ApiError>;

    /// The uploads playlists of the given channels.
    async fn uploads_playlists(
        &self,
        channel_ids: &[String],
    ) -> Result<Vec<RemotePlaylist>, ApiError>;

    /// The subset of `known` playlists whose remote video count moved,
    /// returned with refreshed metadata and thumbnails.
    async fn playlists_with_new_content(
        &self,
        known: &[PlaylistSnapshot],
    ) -> Result<Vec<RemotePlaylist>, ApiError>;

    /// Videos of a playlist that are not in `known_video_ids` yet.
    async fn new_playlist_videos(
        &self,
        playlist_id: &str,
        known_video_ids: &[String],
        authorized: bool,
    ) -> Result<Vec<RemoteVideo>, ApiError>;

    /// Fresh view counts, as `(video id, view count)` pairs.
    async fn update_video_view_counts(
        &self,
        video_ids: &[String],
    ) -> Result<Vec<(String, u64)>, ApiError>;

    /// Adds a video to one of the account's own playlists (watch later,
    /// watch history).
    async fn add_video_to_playlist(
        &self,
        video_id: &str,
        playlist_id: &str,
    ) -> Result<(), ApiError>;

    /// Resolves a pasted URL to a subscribable channel or playlist id,
    /// looking up user names remotely.
    async fn resolve_incognito_subscription(
        &self,
        raw_url: &str,
    ) -> Result<IncognitoResolution, ApiError>;
}

/// The browser identity source: which account is signed in right now.
///
/// Only the signed-in identity's privileged data is reachable; other
/// accounts get placeholder entities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_account_id(&self) -> Result<Option<String>, ApiError>;
}

/// Runs `operation` up to `attempts` times, retrying authorization failures
/// with linearly growing backoff. Any other error returns immediately.
pub async fn retry_on_authorization<T, Fut>(
    attempts: u32,
    backoff: Duration,
    mut operation: impl FnMut() -> Fut,
) -> Result<T, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Err(error) if error.is_authorization() && attempt < attempts => {
                tracing::warn!(attempt, error = %error, "Authorization failed, retrying");
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
