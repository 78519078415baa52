//! Incognito subscriptions
//!
//! Subscriptions not tied to any account, identified directly by channel or
//! playlist id. The manager serves interactive add requests; the
//! synchronizer applies the gateway's reconciled `CHANNEL_*`/`PLAYLIST_*`
//! modifications to the entity graph.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::YouTubeApi;
use crate::bus::{Actor, HandlerError, Mailbox};
use crate::message::Payload;
use crate::sync::SyncStorageGateway;
use crate::topics;

use super::db::Database;
use super::error::GraphError;
use super::model::{Membership, Subscription, SubscriptionKind, SubscriptionState};
use super::videos::{refresh_subscription_videos, remove_subscription_cascade};

/// Reply answered when the requested subscription was written.
pub const STATUS_OK: &str = "ok";

/// Reply answered when a matching subscription already exists.
pub const STATUS_DUPLICATE: &str = "duplicate";

/// Actor serving `incognito-subscriptions.add-requested` asks.
pub struct IncognitoSubscriptionManager {
    mailbox: Mailbox,
    db: Database,
    gateway: Arc<SyncStorageGateway>,
    api: Arc<dyn YouTubeApi>,
}

impl IncognitoSubscriptionManager {
    pub fn new(db: Database, gateway: Arc<SyncStorageGateway>, api: Arc<dyn YouTubeApi>) -> Self {
        Self {
            mailbox: Mailbox::new(),
            db,
            gateway,
            api,
        }
    }

    async fn on_add_requested(&self, raw_url: &str) -> Result<Payload, GraphError> {
        let resolution = self.api.resolve_incognito_subscription(raw_url).await?;

        {
            let txn = self.db.transaction().await;
            if txn
                .find_subscription_matching(true, resolution.kind, &resolution.resource_id)
                .is_some()
            {
                tracing::info!(resource = %resolution.resource_id, "Subscription already exists");
                return Ok(Payload::Text(STATUS_DUPLICATE.to_string()));
            }
        }

        // the store change notification drives the actual persistence
        self.gateway
            .add_incognito_subscription(resolution.kind, &resolution.resource_id)
            .await?;
        tracing::info!(resource = %resolution.resource_id, "Incognito subscription requested");
        Ok(Payload::Text(STATUS_OK.to_string()))
    }
}

#[async_trait]
impl Actor for IncognitoSubscriptionManager {
    fn name(&self) -> &'static str {
        "incognito-subscription-manager"
    }

    fn topics(&self) -> &'static [&'static str] {
        &[topics::INCOGNITO_SUBSCRIPTIONS_ADD_REQUESTED]
    }

    fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    async fn handle(&self, topic: &str, data: Payload) -> Result<Option<Payload>, HandlerError> {
        let url = data.text().ok_or_else(|| GraphError::UnexpectedPayload {
            topic: topic.to_string(),
        })?;
        Ok(Some(self.on_add_requested(url).await?))
    }
}

/// Actor applying `storage.sync.CHANNEL_*`/`PLAYLIST_*` modifications.
pub struct IncognitoSubscriptionsSynchronizer {
    mailbox: Mailbox,
    db: Database,
}

impl IncognitoSubscriptionsSynchronizer {
    pub fn new(db: Database) -> Self {
        Self {
            mailbox: Mailbox::new(),
            db,
        }
    }

    async fn on_added(&self, kind: SubscriptionKind, resource_id: &str) -> Result<(), GraphError> {
        let mut txn = self.db.transaction().await;
        if txn
            .find_subscription_matching(true, kind, resource_id)
            .is_some()
        {
            tracing::warn!(resource = %resource_id, "Subscription row already present, ignoring");
            return Ok(());
        }

        let subscription_id = txn.insert_subscription(Subscription {
            id: 0,
            kind,
            channel_id: (kind == SubscriptionKind::Channel).then(|| resource_id.to_string()),
            playlist_id: (kind == SubscriptionKind::Playlist).then(|| resource_id.to_string()),
            state: SubscriptionState::Active,
            account_id: None,
            incognito: true,
        });

        // channel and playlist entities are created lazily by the video
        // fetch; only already-known entities gain the membership here
        match kind {
            SubscriptionKind::Channel => {
                if let Some(mut channel) = txn.find_channel(resource_id) {
                    channel.add_incognito_subscription(subscription_id);
                    txn.persist_channel(channel);
                    for mut video in txn.videos_by_channel(resource_id) {
                        video.add_incognito_subscription(subscription_id);
                        video.enabled = true;
                        txn.persist_video(video);
                    }
                }
            }
            SubscriptionKind::Playlist => {
                if let Some(mut playlist) = txn.find_playlist(resource_id) {
                    playlist.add_incognito_subscription(subscription_id);
                    txn.persist_playlist(playlist);
                }
            }
        }
        txn.commit();

        tracing::info!(resource = %resource_id, subscription = subscription_id, "Incognito subscription added");
        Ok(())
    }

    async fn on_switched(
        &self,
        kind: SubscriptionKind,
        resource_id: &str,
        enabled: bool,
    ) -> Result<(), GraphError> {
        let mut txn = self.db.transaction().await;
        let mut subscription = txn
            .find_subscription_matching(true, kind, resource_id)
            .ok_or(GraphError::MissingEntity {
                kind: "subscription",
                id: resource_id.to_string(),
            })?;

        subscription.state = if enabled {
            SubscriptionState::Active
        } else {
            SubscriptionState::Disabled
        };
        let subscription_id = subscription.id;
        txn.persist_subscription(subscription);
        refresh_subscription_videos(&mut txn, subscription_id, enabled);
        txn.commit();

        tracing::info!(resource = %resource_id, enabled, "Incognito subscription switched");
        Ok(())
    }

    async fn on_removed(
        &self,
        kind: SubscriptionKind,
        resource_id: &str,
    ) -> Result<(), GraphError> {
        let mut txn = self.db.transaction().await;
        let subscription = match txn.find_subscription_matching(true, kind, resource_id) {
            Some(subscription) => subscription,
            None => {
                tracing::warn!(resource = %resource_id, "Removed subscription was never persisted");
                return Ok(());
            }
        };

        remove_subscription_cascade(&mut txn, &subscription);
        txn.commit();

        tracing::info!(resource = %resource_id, "Incognito subscription removed with cascade");
        Ok(())
    }
}

#[async_trait]
impl Actor for IncognitoSubscriptionsSynchronizer {
    fn name(&self) -> &'static str {
        "incognito-subscriptions-synchronizer"
    }

    fn topics(&self) -> &'static [&'static str] {
        &[
            topics::storage::CHANNEL_ADDED,
            topics::storage::CHANNEL_ENABLED,
            topics::storage::CHANNEL_DISABLED,
            topics::storage::CHANNEL_REMOVED,
            topics::storage::PLAYLIST_ADDED,
            topics::storage::PLAYLIST_ENABLED,
            topics::storage::PLAYLIST_DISABLED,
            topics::storage::PLAYLIST_REMOVED,
        ]
    }

    fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    async fn handle(&self, topic: &str, data: Payload) -> Result<Option<Payload>, HandlerError> {
        let resource_id = data
            .resource_id()
            .ok_or_else(|| GraphError::UnexpectedPayload {
                topic: topic.to_string(),
            })?
            .to_string();

        match topic {
            topics::storage::CHANNEL_ADDED => {
                self.on_added(SubscriptionKind::Channel, &resource_id).await?
            }
            topics::storage::PLAYLIST_ADDED => {
                self.on_added(SubscriptionKind::Playlist, &resource_id)
                    .await?
            }
            topics::storage::CHANNEL_ENABLED => {
                self.on_switched(SubscriptionKind::Channel, &resource_id, true)
                    .await?
            }
            topics::storage::PLAYLIST_ENABLED => {
                self.on_switched(SubscriptionKind::Playlist, &resource_id, true)
                    .await?
            }
            topics::storage::CHANNEL_DISABLED => {
                self.on_switched(SubscriptionKind::Channel, &resource_id, false)
                    .await?
            }
            topics::storage::PLAYLIST_DISABLED => {
                self.on_switched(SubscriptionKind::Playlist, &resource_id, false)
                    .await?
            }
            topics::storage::CHANNEL_REMOVED => {
                self.on_removed(SubscriptionKind::Channel, &resource_id)
                    .await?
            }
            topics::storage::PLAYLIST_REMOVED => {
                self.on_removed(SubscriptionKind::Playlist, &resource_id)
                    .await?
            }
            _ => {}
        }
        Ok(None)
    }
}
