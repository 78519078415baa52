//! Scriptable in-memory API client for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::graph::model::{Account, SubscriptionKind};

use super::error::ApiError;
use super::url::SubscriptionUrl;
use super::{
    IdentityProvider, IncognitoResolution, PlaylistSnapshot, RemoteChannel, RemotePlaylist,
    RemoteVideo, YouTubeApi,
};

#[derive(Default)]
struct StubState {
    accounts: HashMap<String, Account>,
    denied_accounts: HashSet<String>,
    subscriptions: HashMap<String, Vec<RemoteChannel>>,
    authorized_only: HashSet<String>,
    uploads: HashMap<String, RemotePlaylist>,
    changed_playlists: Vec<RemotePlaylist>,
    playlist_videos: HashMap<String, Vec<RemoteVideo>>,
    view_counts: HashMap<String, u64>,
    user_channels: HashMap<String, String>,
}

/// Scriptable [`YouTubeApi`] implementation.
#[derive(Default)]
pub struct StubApi {
    state: Mutex<StubState>,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(&self, account: Account) -> &Self {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(account.id.clone(), account);
        self
    }

    /// Makes `account_info` fail with an authorization error for this id.
    pub fn deny_account(&self, account_id: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .denied_accounts
            .insert(account_id.to_string());
        self
    }

    pub fn with_subscriptions(&self, account_id: &str, channels: Vec<RemoteChannel>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .insert(account_id.to_string(), channels);
        self
    }

    /// Makes unauthorized subscription reads fail for this account.
    pub fn require_authorization(&self, account_id: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .authorized_only
            .insert(account_id.to_string());
        self
    }

    pub fn with_uploads_playlist(&self, channel_id: &str, playlist: RemotePlaylist) -> &Self {
        self.state
            .lock()
            .unwrap()
            .uploads
            .insert(channel_id.to_string(), playlist);
        self
    }

    pub fn with_changed_playlist(&self, playlist: RemotePlaylist) -> &Self {
        self.state.lock().unwrap().changed_playlists.push(playlist);
        self
    }

    pub fn with_playlist_videos(&self, playlist_id: &str, videos: Vec<RemoteVideo>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .playlist_videos
            .insert(playlist_id.to_string(), videos);
        self
    }

    pub fn with_view_count(&self, video_id: &str, count: u64) -> &Self {
        self.state
            .lock()
            .unwrap()
            .view_counts
            .insert(video_id.to_string(), count);
        self
    }

    pub fn with_user_channel(&self, user: &str, channel_id: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .user_channels
            .insert(user.to_string(), channel_id.to_string());
        self
    }
}

#[async_trait]
impl YouTubeApi for StubApi {
    async fn account_info(
        &self,
        account_id: &str,
        _channel_id: Option<&str>,
    ) -> Result<Account, ApiError> {
        let state = self.state.lock().unwrap();
        if state.denied_accounts.contains(account_id) {
            return Err(ApiError::Authorization(format!(
                "no credentials for {account_id}"
            )));
        }
        state
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| ApiError::Request(format!("unknown account {account_id}")))
    }

    async fn subscriptions(
        &self,
        account_id: &str,
        authorized: bool,
    ) -> Result<Vec<RemoteChannel>, ApiError> {
        let state = self.state.lock().unwrap();
        if !authorized && state.authorized_only.contains(account_id) {
            return Err(ApiError::Authorization(format!(
                "{account_id} is not publicly readable"
            )));
        }
        Ok(state
            .subscriptions
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn uploads_playlists(
        &self,
        channel_ids: &[String],
    ) -> Result<Vec<RemotePlaylist>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(channel_ids
            .iter()
            .filter_map(|id| state.uploads.get(id).cloned())
            .collect())
    }

    async fn playlists_with_new_content(
        &self,
        known: &[PlaylistSnapshot],
    ) -> Result<Vec<RemotePlaylist>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .changed_playlists
            .iter()
            .filter(|changed| {
                known
                    .iter()
                    .any(|k| k.id == changed.id && k.video_count != changed.video_count)
            })
            .cloned()
            .collect())
    }

    async fn new_playlist_videos(
        &self,
        playlist_id: &str,
        known_video_ids: &[String],
        _authorized: bool,
    ) -> Result<Vec<RemoteVideo>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .playlist_videos
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|video| !known_video_ids.contains(&video.id))
            .collect())
    }

    async fn update_video_view_counts(
        &self,
        video_ids: &[String],
    ) -> Result<Vec<(String, u64)>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(video_ids
            .iter()
            .filter_map(|id| state.view_counts.get(id).map(|count| (id.clone(), *count)))
            .collect())
    }

    async fn add_video_to_playlist(
        &self,
        _video_id: &str,
        _playlist_id: &str,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn resolve_incognito_subscription(
        &self,
        raw_url: &str,
    ) -> Result<IncognitoResolution, ApiError> {
        match SubscriptionUrl::parse(raw_url)? {
            SubscriptionUrl::Channel(id) => Ok(IncognitoResolution {
                kind: SubscriptionKind::Channel,
                resource_id: id,
            }),
            SubscriptionUrl::Playlist(id) => Ok(IncognitoResolution {
                kind: SubscriptionKind::Playlist,
                resource_id: id,
            }),
            SubscriptionUrl::User(name) => {
                let state = self.state.lock().unwrap();
                state
                    .user_channels
                    .get(&name)
                    .map(|id| IncognitoResolution {
                        kind: SubscriptionKind::Channel,
                        resource_id: id.clone(),
                    })
                    .ok_or_else(|| ApiError::Request(format!("unknown user {name}")))
            }
        }
    }
}

/// Scriptable [`IdentityProvider`].
#[derive(Default)]
pub struct StubIdentity {
    current: Mutex<Option<String>>,
}

impl StubIdentity {
    pub fn signed_in(account_id: &str) -> Self {
        Self {
            current: Mutex::new(Some(account_id.to_string())),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, account_id: &str) {
        *self.current.lock().unwrap() = Some(account_id.to_string());
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn current_account_id(&self) -> Result<Option<String>, ApiError> {
        Ok(self.current.lock().unwrap().clone())
    }
}
