//! Video fetching
//!
//! Polls the remote API for playlists whose video count moved, ingests
//! their new videos with membership copied from the playlist, and refreshes
//! stored view counts. Driven by a heartbeat or on demand.

use std::sync::Arc;

use chrono::Utc;

use crate::api::{PlaylistSnapshot, RemotePlaylist, YouTubeApi};

use super::db::Database;
use super::error::GraphError;
use super::model::Video;
use super::videos::compute_enabled;

pub struct VideoFetcher {
    db: Database,
    api: Arc<dyn YouTubeApi>,
}

impl VideoFetcher {
    pub fn new(db: Database, api: Arc<dyn YouTubeApi>) -> Self {
        Self { db, api }
    }

    /// Fetches new videos for every playlist with new remote content.
    /// Returns the number of ingested videos.
    pub async fn fetch_new_videos(&self) -> Result<usize, GraphError> {
        let snapshots: Vec<PlaylistSnapshot> = {
            let txn = self.db.transaction().await;
            txn.playlists()
                .into_iter()
                .map(|playlist| PlaylistSnapshot {
                    id: playlist.id,
                    video_count: playlist.video_count,
                })
                .collect()
        };
        if snapshots.is_empty() {
            return Ok(0);
        }

        let changed = self.api.playlists_with_new_content(&snapshots).await?;
        let mut ingested = 0;
        for refreshed in changed {
            ingested += self.refresh_playlist(refreshed).await?;
        }
        Ok(ingested)
    }

    async fn refresh_playlist(&self, refreshed: RemotePlaylist) -> Result<usize, GraphError> {
        let mut txn = self.db.transaction().await;
        let mut playlist = txn
            .find_playlist(&refreshed.id)
            .ok_or(GraphError::MissingEntity {
                kind: "playlist",
                id: refreshed.id.clone(),
            })?;

        let channel_id = playlist
            .channel_id
            .clone()
            .or_else(|| refreshed.channel_id.clone());
        let known: Vec<String> = channel_id
            .as_deref()
            .map(|channel_id| {
                txn.videos_by_channel(channel_id)
                    .into_iter()
                    .map(|video| video.id)
                    .collect()
            })
            .unwrap_or_default();

        let new = match self
            .api
            .new_playlist_videos(&playlist.id, &known, false)
            .await
        {
            Ok(videos) => videos,
            Err(error) if error.is_authorization() => {
                self.api
                    .new_playlist_videos(&playlist.id, &known, true)
                    .await?
            }
            Err(error) => return Err(error.into()),
        };

        let enabled_accounts = txn.enabled_account_ids();
        let enabled_subscriptions = txn.enabled_incognito_subscription_ids();
        let ingested = new.len();
        for remote in new {
            let mut video = Video {
                id: remote.id,
                channel_id: remote.channel_id,
                title: remote.title,
                description: remote.description,
                published_at: remote.published_at,
                thumbnail: remote.thumbnail,
                duration: remote.duration,
                view_count: remote.view_count,
                account_ids: playlist.account_ids.clone(),
                incognito_subscription_ids: playlist.incognito_subscription_ids.clone(),
                watched: false,
                enabled: false,
                last_update: Utc::now(),
            };
            video.enabled = compute_enabled(&video, &enabled_accounts, &enabled_subscriptions);
            txn.persist_video(video);
        }

        playlist.title = refreshed.title;
        playlist.description = refreshed.description;
        playlist.thumbnail = refreshed.thumbnail;
        playlist.video_count = refreshed.video_count;
        if playlist.channel_id.is_none() {
            playlist.channel_id = refreshed.channel_id;
        }
        let playlist_id = playlist.id.clone();
        txn.persist_playlist(playlist);
        txn.commit();

        tracing::info!(playlist = %playlist_id, ingested, "Playlist videos fetched");
        Ok(ingested)
    }

    /// Refreshes the view count of every stored video.
    pub async fn update_view_counts(&self) -> Result<(), GraphError> {
        let ids: Vec<String> = {
            let txn = self.db.transaction().await;
            txn.videos().into_iter().map(|video| video.id).collect()
        };
        if ids.is_empty() {
            return Ok(());
        }

        let counts = self.api.update_video_view_counts(&ids).await?;
        let mut txn = self.db.transaction().await;
        for (id, view_count) in counts {
            if let Some(mut video) = txn.find_video(&id) {
                video.view_count = view_count;
                video.last_update = Utc::now();
                txn.persist_video(video);
            }
        }
        txn.commit();
        Ok(())
    }
}
