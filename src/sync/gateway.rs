//! Synchronized storage gateway
//!
//! Wraps the external synchronized store. Inbound: decodes old/new values of
//! each change notification, runs the reconciler and fires one bus topic per
//! modification. Outbound: read-modify-write mutations of the resource lists,
//! each guarded by a per-resource-class FIFO mutex so concurrent mutations
//! never lose updates.
//!
//! Mutations do not fire reconciliation topics themselves; the store's own
//! change notification does that once the write is observed, so the gateway
//! never double-reports its own writes.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::graph::model::SubscriptionKind;
use crate::message::Payload;
use crate::topics::storage as storage_topics;

use super::codec::{self, ResourceEntry};
use super::error::GatewayError;
use super::reconcile::{reconcile, ModificationKind};
use super::store::{StoreChange, SyncStore, QUOTA_BYTES, QUOTA_BYTES_PER_ITEM};

/// Storage item keys, kept to one byte each against the store quota.
const KEY_ACCOUNTS: &str = "a";
const KEY_CHANNELS: &str = "c";
const KEY_PLAYLISTS: &str = "p";

/// An incognito subscription target in the synchronized store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncognitoTarget {
    pub kind: SubscriptionKind,
    pub resource_id: String,
}

impl IncognitoTarget {
    pub fn new(kind: SubscriptionKind, resource_id: impl Into<String>) -> Self {
        Self {
            kind,
            resource_id: resource_id.into(),
        }
    }
}

/// Current quota usage of the tracked items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaUsage {
    pub accounts: u64,
    pub channels: u64,
    pub playlists: u64,
    pub item_maximum: u64,
    pub total_maximum: u64,
}

/// Gateway between the synchronized store and the event bus.
pub struct SyncStorageGateway {
    store: Arc<dyn SyncStore>,
    bus: Arc<EventBus>,
    accounts_lock: Mutex<()>,
    subscriptions_lock: Mutex<()>,
}

impl SyncStorageGateway {
    pub fn new(store: Arc<dyn SyncStore>, bus: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            store,
            bus,
            accounts_lock: Mutex::new(()),
            subscriptions_lock: Mutex::new(()),
        })
    }

    /// Spawns the task that turns store change notifications into bus
    /// topics. The task ends when the change feed closes.
    pub fn spawn_change_listener(
        self: Arc<Self>,
        mut changes: broadcast::Receiver<StoreChange>,
    ) -> JoinHandle<()> {
        let gateway = self;
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if let Err(error) = gateway.process_change(&change) {
                            tracing::error!(
                                key = %change.key,
                                error = %error,
                                "Failed to reconcile store change"
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Change feed lagged, notifications lost");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Reconciles one change notification and fires a topic per
    /// modification. Changes to untracked keys are ignored.
    pub fn process_change(&self, change: &StoreChange) -> Result<(), GatewayError> {
        let events = match change.key.as_str() {
            KEY_ACCOUNTS => ACCOUNT_EVENTS,
            KEY_CHANNELS => CHANNEL_EVENTS,
            KEY_PLAYLISTS => PLAYLIST_EVENTS,
            _ => return Ok(()),
        };

        let old = codec::decode(change.old.as_ref())?;
        let new = codec::decode(change.new.as_ref())?;

        for modification in reconcile(&old, &new) {
            let topic = events.topic(modification.kind);
            tracing::debug!(topic = %topic, id = %modification.id, "Storage modification");
            self.bus.fire(topic, Payload::Resource { id: modification.id })?;
        }

        Ok(())
    }

    /// The managed accounts with their enabled flags.
    pub async fn accounts(&self) -> Result<Vec<ResourceEntry>, GatewayError> {
        self.read(KEY_ACCOUNTS).await
    }

    /// Looks up a single account entry under the accounts lock. Used by the
    /// accounts synchronizer to re-check that a reconciled account still
    /// exists by the time its handler runs.
    pub async fn find_account(&self, id: &str) -> Result<Option<ResourceEntry>, GatewayError> {
        let _guard = self.accounts_lock.lock().await;
        let accounts = self.read(KEY_ACCOUNTS).await?;
        Ok(accounts.into_iter().find(|entry| entry.id == id))
    }

    /// Adds an account, enabled, unless already present.
    pub async fn add_account(&self, account_id: &str) -> Result<(), GatewayError> {
        let _guard = self.accounts_lock.lock().await;
        let mut accounts = self.read(KEY_ACCOUNTS).await?;

        if accounts.iter().any(|entry| entry.id == account_id) {
            return Ok(());
        }
        accounts.push(ResourceEntry::new(account_id, true));
        self.write(KEY_ACCOUNTS, &accounts).await
    }

    pub async fn enable_accounts(&self, account_ids: &[String]) -> Result<(), GatewayError> {
        self.switch_accounts(true, account_ids).await
    }

    pub async fn disable_accounts(&self, account_ids: &[String]) -> Result<(), GatewayError> {
        self.switch_accounts(false, account_ids).await
    }

    /// Deletes accounts from the managed list.
    pub async fn remove_accounts(&self, account_ids: &[String]) -> Result<(), GatewayError> {
        let doomed: HashSet<&str> = account_ids.iter().map(String::as_str).collect();

        let _guard = self.accounts_lock.lock().await;
        let mut accounts = self.read(KEY_ACCOUNTS).await?;

        let before = accounts.len();
        accounts.retain(|entry| !doomed.contains(entry.id.as_str()));
        if accounts.len() == before {
            return Ok(());
        }
        self.write(KEY_ACCOUNTS, &accounts).await
    }

    /// The incognito subscriptions, channels before playlists.
    pub async fn incognito_subscriptions(
        &self,
    ) -> Result<Vec<(SubscriptionKind, ResourceEntry)>, GatewayError> {
        let channels = self.read(KEY_CHANNELS).await?;
        let playlists = self.read(KEY_PLAYLISTS).await?;

        let mut entries = Vec::with_capacity(channels.len() + playlists.len());
        entries.extend(
            channels
                .into_iter()
                .map(|entry| (SubscriptionKind::Channel, entry)),
        );
        entries.extend(
            playlists
                .into_iter()
                .map(|entry| (SubscriptionKind::Playlist, entry)),
        );
        Ok(entries)
    }

    /// Adds an incognito subscription, enabled, unless already present.
    pub async fn add_incognito_subscription(
        &self,
        kind: SubscriptionKind,
        resource_id: &str,
    ) -> Result<(), GatewayError> {
        let key = Self::subscription_key(kind);

        let _guard = self.subscriptions_lock.lock().await;
        let mut entries = self.read(key).await?;

        if entries.iter().any(|entry| entry.id == resource_id) {
            return Ok(());
        }
        entries.push(ResourceEntry::new(resource_id, true));
        self.write(key, &entries).await
    }

    pub async fn enable_incognito_subscriptions(
        &self,
        targets: &[IncognitoTarget],
    ) -> Result<(), GatewayError> {
        self.switch_subscriptions(true, targets).await
    }

    pub async fn disable_incognito_subscriptions(
        &self,
        targets: &[IncognitoTarget],
    ) -> Result<(), GatewayError> {
        self.switch_subscriptions(false, targets).await
    }

    /// Deletes incognito subscriptions from both tracked lists.
    pub async fn remove_incognito_subscriptions(
        &self,
        targets: &[IncognitoTarget],
    ) -> Result<(), GatewayError> {
        let (channels_doomed, playlists_doomed) = Self::split_targets(targets);

        let _guard = self.subscriptions_lock.lock().await;
        let mut channels = self.read(KEY_CHANNELS).await?;
        let mut playlists = self.read(KEY_PLAYLISTS).await?;

        let channels_before = channels.len();
        channels.retain(|entry| !channels_doomed.contains(entry.id.as_str()));
        let playlists_before = playlists.len();
        playlists.retain(|entry| !playlists_doomed.contains(entry.id.as_str()));

        if channels.len() != channels_before {
            self.write(KEY_CHANNELS, &channels).await?;
        }
        if playlists.len() != playlists_before {
            self.write(KEY_PLAYLISTS, &playlists).await?;
        }
        Ok(())
    }

    /// Current byte usage of the tracked items against the store quotas.
    pub async fn quota_usage(&self) -> Result<QuotaUsage, GatewayError> {
        Ok(QuotaUsage {
            accounts: self.store.bytes_in_use(KEY_ACCOUNTS).await?,
            channels: self.store.bytes_in_use(KEY_CHANNELS).await?,
            playlists: self.store.bytes_in_use(KEY_PLAYLISTS).await?,
            item_maximum: QUOTA_BYTES_PER_ITEM,
            total_maximum: QUOTA_BYTES,
        })
    }

    async fn switch_accounts(
        &self,
        enable: bool,
        account_ids: &[String],
    ) -> Result<(), GatewayError> {
        let targets: HashSet<&str> = account_ids.iter().map(String::as_str).collect();

        let _guard = self.accounts_lock.lock().await;
        let mut accounts = self.read(KEY_ACCOUNTS).await?;

        let mut changed = false;
        for entry in accounts.iter_mut() {
            if targets.contains(entry.id.as_str()) && entry.enabled != enable {
                entry.enabled = enable;
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
        self.write(KEY_ACCOUNTS, &accounts).await
    }

    async fn switch_subscriptions(
        &self,
        enable: bool,
        targets: &[IncognitoTarget],
    ) -> Result<(), GatewayError> {
        let (channel_targets, playlist_targets) = Self::split_targets(targets);

        let _guard = self.subscriptions_lock.lock().await;
        let mut channels = self.read(KEY_CHANNELS).await?;
        let mut playlists = self.read(KEY_PLAYLISTS).await?;

        let mut channels_changed = false;
        for entry in channels.iter_mut() {
            if channel_targets.contains(entry.id.as_str()) && entry.enabled != enable {
                entry.enabled = enable;
                channels_changed = true;
            }
        }
        let mut playlists_changed = false;
        for entry in playlists.iter_mut() {
            if playlist_targets.contains(entry.id.as_str()) && entry.enabled != enable {
                entry.enabled = enable;
                playlists_changed = true;
            }
        }

        if channels_changed {
            self.write(KEY_CHANNELS, &channels).await?;
        }
        if playlists_changed {
            self.write(KEY_PLAYLISTS, &playlists).await?;
        }
        Ok(())
    }

    fn split_targets(targets: &[IncognitoTarget]) -> (HashSet<&str>, HashSet<&str>) {
        let mut channels = HashSet::new();
        let mut playlists = HashSet::new();
        for target in targets {
            match target.kind {
                SubscriptionKind::Channel => channels.insert(target.resource_id.as_str()),
                SubscriptionKind::Playlist => playlists.insert(target.resource_id.as_str()),
            };
        }
        (channels, playlists)
    }

    fn subscription_key(kind: SubscriptionKind) -> &'static str {
        match kind {
            SubscriptionKind::Channel => KEY_CHANNELS,
            SubscriptionKind::Playlist => KEY_PLAYLISTS,
        }
    }

    async fn read(&self, key: &str) -> Result<Vec<ResourceEntry>, GatewayError> {
        let raw = self.store.get(key).await?;
        Ok(codec::decode(raw.as_ref())?)
    }

    async fn write(&self, key: &str, entries: &[ResourceEntry]) -> Result<(), GatewayError> {
        self.store.set(key, codec::encode(entries)).await?;
        Ok(())
    }
}

struct ModificationEvents {
    added: &'static str,
    enabled: &'static str,
    disabled: &'static str,
    removed: &'static str,
}

impl ModificationEvents {
    fn topic(&self, kind: ModificationKind) -> &'static str {
        match kind {
            ModificationKind::Added => self.added,
            ModificationKind::Enabled => self.enabled,
            ModificationKind::Disabled => self.disabled,
            ModificationKind::Removed => self.removed,
        }
    }
}

const ACCOUNT_EVENTS: &ModificationEvents = &ModificationEvents {
    added: storage_topics::ACCOUNT_ADDED,
    enabled: storage_topics::ACCOUNT_ENABLED,
    disabled: storage_topics::ACCOUNT_DISABLED,
    removed: storage_topics::ACCOUNT_REMOVED,
};

const CHANNEL_EVENTS: &ModificationEvents = &ModificationEvents {
    added: storage_topics::CHANNEL_ADDED,
    enabled: storage_topics::CHANNEL_ENABLED,
    disabled: storage_topics::CHANNEL_DISABLED,
    removed: storage_topics::CHANNEL_REMOVED,
};

const PLAYLIST_EVENTS: &ModificationEvents = &ModificationEvents {
    added: storage_topics::PLAYLIST_ADDED,
    enabled: storage_topics::PLAYLIST_ENABLED,
    disabled: storage_topics::PLAYLIST_DISABLED,
    removed: storage_topics::PLAYLIST_REMOVED,
};
