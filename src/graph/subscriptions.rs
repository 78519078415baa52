//! Per-account subscription fetching
//!
//! Pulls an account's current remote subscription list and reconciles the
//! local rows against it: unknown pairs get a subscription row plus
//! find-or-create channel and uploads playlist, pairs gone from the remote
//! list are removed with the membership cascade. One transaction per
//! account, so a failed pass leaves the graph untouched.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{ApiError, RemoteChannel, YouTubeApi};

use super::db::{Database, Transaction};
use super::error::GraphError;
use super::model::{
    Account, Channel, Membership, Playlist, Subscription, SubscriptionKind, SubscriptionState,
};
use super::videos::remove_account_subscription_cascade;

pub struct SubscriptionsFetcher {
    db: Database,
    api: Arc<dyn YouTubeApi>,
}

impl SubscriptionsFetcher {
    pub fn new(db: Database, api: Arc<dyn YouTubeApi>) -> Self {
        Self { db, api }
    }

    /// Reconciles one account's subscriptions against the remote list.
    pub async fn fetch(&self, account: &Account) -> Result<(), GraphError> {
        // some accounts are publicly readable; only fall back to credentials
        // when the unauthorized read is refused
        let remote = match self.api.subscriptions(&account.id, false).await {
            Ok(channels) => channels,
            Err(error) if error.is_authorization() => {
                tracing::debug!(
                    account = %account.id,
                    "Unauthorized read refused, retrying with credentials"
                );
                self.api.subscriptions(&account.id, true).await?
            }
            Err(error) => return Err(error.into()),
        };

        let mut txn = self.db.transaction().await;

        let mut unseen: HashMap<String, Subscription> = txn
            .subscriptions_by_account(&account.id)
            .into_iter()
            .filter_map(|s| s.channel_id.clone().map(|channel_id| (channel_id, s)))
            .collect();

        let mut added = 0usize;
        for channel in &remote {
            if unseen.remove(&channel.id).is_some() {
                continue;
            }
            self.subscribe(&mut txn, account, channel).await?;
            added += 1;
        }

        let removed = unseen.len();
        for subscription in unseen.into_values() {
            remove_account_subscription_cascade(&mut txn, &subscription, &account.id);
        }
        txn.commit();

        tracing::info!(
            account = %account.id,
            added,
            removed,
            "Subscriptions reconciled"
        );
        Ok(())
    }

    async fn subscribe(
        &self,
        txn: &mut Transaction<'_>,
        account: &Account,
        remote: &RemoteChannel,
    ) -> Result<(), GraphError> {
        let mut channel = txn.find_channel(&remote.id).unwrap_or_else(|| Channel {
            id: remote.id.clone(),
            title: remote.title.clone(),
            thumbnail: remote.thumbnail.clone(),
            uploads_playlist_id: remote.uploads_playlist_id.clone(),
            account_ids: Vec::new(),
            incognito_subscription_ids: Vec::new(),
        });
        if channel.uploads_playlist_id.is_none() {
            channel.uploads_playlist_id = remote.uploads_playlist_id.clone();
        }

        let mut playlist = match channel
            .uploads_playlist_id
            .as_deref()
            .and_then(|id| txn.find_playlist(id))
        {
            Some(playlist) => playlist,
            None => {
                let fetched = self
                    .api
                    .uploads_playlists(&[channel.id.clone()])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        ApiError::Request(format!("no uploads playlist for channel {}", channel.id))
                    })?;
                channel.uploads_playlist_id = Some(fetched.id.clone());
                Playlist {
                    id: fetched.id,
                    channel_id: Some(channel.id.clone()),
                    title: fetched.title,
                    description: fetched.description,
                    video_count: fetched.video_count,
                    thumbnail: fetched.thumbnail,
                    account_ids: Vec::new(),
                    incognito_subscription_ids: Vec::new(),
                }
            }
        };

        txn.insert_subscription(Subscription {
            id: 0,
            kind: SubscriptionKind::Channel,
            channel_id: Some(channel.id.clone()),
            playlist_id: Some(playlist.id.clone()),
            state: SubscriptionState::Active,
            account_id: Some(account.id.clone()),
            incognito: false,
        });

        channel.add_account(&account.id);
        if playlist.add_account(&account.id) {
            // the playlist gained this account for the first time: every
            // video already tied to the channel inherits the membership
            for mut video in txn.videos_by_channel(&channel.id) {
                if video.add_account(&account.id) {
                    if account.is_enabled() {
                        video.enabled = true;
                    }
                    txn.persist_video(video);
                }
            }
        }
        txn.persist_channel(channel);
        txn.persist_playlist(playlist);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::api::stub::StubApi;
    use crate::api::RemotePlaylist;
    use crate::graph::model::{AccountState, Video};

    use super::*;

    fn account(id: &str) -> Account {
        Account::placeholder(id, AccountState::Active)
    }

    fn remote_channel(id: &str) -> RemoteChannel {
        RemoteChannel {
            id: id.into(),
            title: format!("Channel {id}"),
            thumbnail: None,
            uploads_playlist_id: None,
        }
    }

    fn remote_playlist(id: &str, channel_id: &str) -> RemotePlaylist {
        RemotePlaylist {
            id: id.into(),
            channel_id: Some(channel_id.into()),
            title: format!("Uploads {id}"),
            description: None,
            video_count: 0,
            thumbnail: None,
        }
    }

    fn fetcher() -> (Database, Arc<StubApi>, SubscriptionsFetcher) {
        let db = Database::new();
        let api = Arc::new(StubApi::new());
        let fetcher = SubscriptionsFetcher::new(db.clone(), api.clone());
        (db, api, fetcher)
    }

    #[tokio::test]
    async fn test_new_subscription_creates_channel_and_playlist() {
        let (db, api, fetcher) = fetcher();
        api.with_subscriptions("u1", vec![remote_channel("UC1")])
            .with_uploads_playlist("UC1", remote_playlist("PL1", "UC1"));

        fetcher.fetch(&account("u1")).await.unwrap();

        let txn = db.transaction().await;
        let channel = txn.find_channel("UC1").unwrap();
        assert_eq!(channel.account_ids, vec!["u1"]);
        assert_eq!(channel.uploads_playlist_id.as_deref(), Some("PL1"));
        let playlist = txn.find_playlist("PL1").unwrap();
        assert_eq!(playlist.account_ids, vec!["u1"]);

        let rows = txn.subscriptions_by_account("u1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].channel_id.as_deref(), Some("UC1"));
        assert_eq!(rows[0].playlist_id.as_deref(), Some("PL1"));
        assert!(!rows[0].incognito);
    }

    #[tokio::test]
    async fn test_repeated_fetch_is_idempotent() {
        let (db, api, fetcher) = fetcher();
        api.with_subscriptions("u1", vec![remote_channel("UC1")])
            .with_uploads_playlist("UC1", remote_playlist("PL1", "UC1"));

        fetcher.fetch(&account("u1")).await.unwrap();
        fetcher.fetch(&account("u1")).await.unwrap();

        let txn = db.transaction().await;
        assert_eq!(txn.subscriptions_by_account("u1").len(), 1);
        assert_eq!(txn.find_channel("UC1").unwrap().account_ids, vec!["u1"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_authorized_read() {
        let (db, api, fetcher) = fetcher();
        api.require_authorization("u1")
            .with_subscriptions("u1", vec![remote_channel("UC1")])
            .with_uploads_playlist("UC1", remote_playlist("PL1", "UC1"));

        fetcher.fetch(&account("u1")).await.unwrap();

        let txn = db.transaction().await;
        assert_eq!(txn.subscriptions_by_account("u1").len(), 1);
    }

    #[tokio::test]
    async fn test_vanished_subscription_is_removed_with_cascade() {
        let (db, api, fetcher) = fetcher();
        api.with_subscriptions("u1", vec![remote_channel("UC1"), remote_channel("UC2")])
            .with_uploads_playlist("UC1", remote_playlist("PL1", "UC1"))
            .with_uploads_playlist("UC2", remote_playlist("PL2", "UC2"));
        fetcher.fetch(&account("u1")).await.unwrap();

        api.with_subscriptions("u1", vec![remote_channel("UC1")]);
        fetcher.fetch(&account("u1")).await.unwrap();

        let txn = db.transaction().await;
        assert_eq!(txn.subscriptions_by_account("u1").len(), 1);
        assert!(txn.find_channel("UC1").is_some());
        assert!(txn.find_channel("UC2").is_none());
        assert!(txn.find_playlist("PL2").is_none());
    }

    #[tokio::test]
    async fn test_membership_propagates_to_existing_videos() {
        let (db, api, fetcher) = fetcher();
        {
            // a video already tied to the channel through an incognito
            // subscription
            let mut txn = db.transaction().await;
            txn.persist_video(Video {
                id: "v1".into(),
                channel_id: "UC1".into(),
                title: "Video".into(),
                description: None,
                published_at: Utc::now(),
                thumbnail: None,
                duration: None,
                view_count: 0,
                account_ids: Vec::new(),
                incognito_subscription_ids: vec![9],
                watched: false,
                enabled: false,
                last_update: Utc::now(),
            });
            txn.commit();
        }
        api.with_subscriptions("u1", vec![remote_channel("UC1")])
            .with_uploads_playlist("UC1", remote_playlist("PL1", "UC1"));

        fetcher.fetch(&account("u1")).await.unwrap();

        let txn = db.transaction().await;
        let video = txn.find_video("v1").unwrap();
        assert_eq!(video.account_ids, vec!["u1"]);
        assert!(video.enabled);
    }

    #[tokio::test]
    async fn test_request_error_rolls_back() {
        let (db, api, fetcher) = fetcher();
        // UC1 resolves, UC2 has no uploads playlist and fails the pass
        api.with_subscriptions("u1", vec![remote_channel("UC1"), remote_channel("UC2")])
            .with_uploads_playlist("UC1", remote_playlist("PL1", "UC1"));

        let result = fetcher.fetch(&account("u1")).await;
        assert!(matches!(result, Err(GraphError::Api(_))));

        let txn = db.transaction().await;
        assert!(txn.subscriptions_by_account("u1").is_empty());
        assert!(txn.find_channel("UC1").is_none());
    }
}
