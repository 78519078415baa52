//! In-memory transactional entity store
//!
//! All tables live behind one async mutex; a [`Transaction`] holds the
//! guard, so one reconciliation pass runs at a time and sees a consistent
//! graph. Commit is explicit — dropping a transaction without committing
//! restores the pre-transaction snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use super::model::{
    Account, Channel, Playlist, Subscription, SubscriptionKind, Video,
};

#[derive(Debug, Default, Clone)]
struct Tables {
    accounts: Vec<Account>,
    channels: Vec<Channel>,
    playlists: Vec<Playlist>,
    subscriptions: Vec<Subscription>,
    videos: Vec<Video>,
    next_subscription_id: u64,
}

/// Handle to the entity store; clones share the same tables.
#[derive(Clone, Default)]
pub struct Database {
    tables: Arc<Mutex<Tables>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction, waiting for any in-flight one to finish.
    pub async fn transaction(&self) -> Transaction<'_> {
        let tables = self.tables.lock().await;
        let snapshot = tables.clone();
        Transaction {
            tables,
            snapshot: Some(snapshot),
        }
    }
}

/// An open transaction over the whole entity graph.
///
/// Typed find/persist/remove/query methods; `persist_*` inserts or
/// overwrites by id. Queries return clones so callers can mutate freely and
/// persist what changed.
pub struct Transaction<'a> {
    tables: MutexGuard<'a, Tables>,
    snapshot: Option<Tables>,
}

impl Transaction<'_> {
    /// Makes every change of this transaction permanent.
    pub fn commit(mut self) {
        self.snapshot = None;
    }

    // accounts

    pub fn find_account(&self, id: &str) -> Option<Account> {
        self.tables.accounts.iter().find(|a| a.id == id).cloned()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.tables.accounts.clone()
    }

    pub fn persist_account(&mut self, account: Account) {
        match self.tables.accounts.iter_mut().find(|a| a.id == account.id) {
            Some(slot) => *slot = account,
            None => self.tables.accounts.push(account),
        }
    }

    pub fn remove_account(&mut self, id: &str) {
        self.tables.accounts.retain(|a| a.id != id);
    }

    // channels

    pub fn find_channel(&self, id: &str) -> Option<Channel> {
        self.tables.channels.iter().find(|c| c.id == id).cloned()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.tables.channels.clone()
    }

    pub fn persist_channel(&mut self, channel: Channel) {
        match self.tables.channels.iter_mut().find(|c| c.id == channel.id) {
            Some(slot) => *slot = channel,
            None => self.tables.channels.push(channel),
        }
    }

    pub fn remove_channel(&mut self, id: &str) {
        self.tables.channels.retain(|c| c.id != id);
    }

    // playlists

    pub fn find_playlist(&self, id: &str) -> Option<Playlist> {
        self.tables.playlists.iter().find(|p| p.id == id).cloned()
    }

    pub fn playlists(&self) -> Vec<Playlist> {
        self.tables.playlists.clone()
    }

    pub fn persist_playlist(&mut self, playlist: Playlist) {
        match self
            .tables
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist.id)
        {
            Some(slot) => *slot = playlist,
            None => self.tables.playlists.push(playlist),
        }
    }

    pub fn remove_playlist(&mut self, id: &str) {
        self.tables.playlists.retain(|p| p.id != id);
    }

    // subscriptions

    /// Inserts a subscription row, assigning the next numeric id.
    pub fn insert_subscription(&mut self, mut subscription: Subscription) -> u64 {
        let id = self.tables.next_subscription_id;
        self.tables.next_subscription_id += 1;
        subscription.id = id;
        self.tables.subscriptions.push(subscription);
        id
    }

    pub fn find_subscription(&self, id: u64) -> Option<Subscription> {
        self.tables
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// The existing row matching `(incognito, kind, resource id)`, the
    /// uniqueness key for subscription rows.
    pub fn find_subscription_matching(
        &self,
        incognito: bool,
        kind: SubscriptionKind,
        resource_id: &str,
    ) -> Option<Subscription> {
        self.tables
            .subscriptions
            .iter()
            .find(|s| {
                s.incognito == incognito
                    && s.kind == kind
                    && s.resource_id() == Some(resource_id)
            })
            .cloned()
    }

    pub fn subscriptions_by_account(&self, account_id: &str) -> Vec<Subscription> {
        self.tables
            .subscriptions
            .iter()
            .filter(|s| s.account_id.as_deref() == Some(account_id))
            .cloned()
            .collect()
    }

    pub fn persist_subscription(&mut self, subscription: Subscription) {
        match self
            .tables
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
        {
            Some(slot) => *slot = subscription,
            None => self.tables.subscriptions.push(subscription),
        }
    }

    pub fn remove_subscription(&mut self, id: u64) {
        self.tables.subscriptions.retain(|s| s.id != id);
    }

    // videos

    pub fn find_video(&self, id: &str) -> Option<Video> {
        self.tables.videos.iter().find(|v| v.id == id).cloned()
    }

    pub fn videos(&self) -> Vec<Video> {
        self.tables.videos.clone()
    }

    pub fn videos_by_account(&self, account_id: &str) -> Vec<Video> {
        self.tables
            .videos
            .iter()
            .filter(|v| v.account_ids.iter().any(|id| id == account_id))
            .cloned()
            .collect()
    }

    pub fn videos_by_incognito_subscription(&self, subscription_id: u64) -> Vec<Video> {
        self.tables
            .videos
            .iter()
            .filter(|v| v.incognito_subscription_ids.contains(&subscription_id))
            .cloned()
            .collect()
    }

    pub fn videos_by_channel(&self, channel_id: &str) -> Vec<Video> {
        self.tables
            .videos
            .iter()
            .filter(|v| v.channel_id == channel_id)
            .cloned()
            .collect()
    }

    pub fn persist_video(&mut self, video: Video) {
        match self.tables.videos.iter_mut().find(|v| v.id == video.id) {
            Some(slot) => *slot = video,
            None => self.tables.videos.push(video),
        }
    }

    pub fn remove_video(&mut self, id: &str) {
        self.tables.videos.retain(|v| v.id != id);
    }

    // enabled sets, for recomputing cached video flags

    pub fn enabled_account_ids(&self) -> HashSet<String> {
        self.tables
            .accounts
            .iter()
            .filter(|a| a.is_enabled())
            .map(|a| a.id.clone())
            .collect()
    }

    pub fn enabled_incognito_subscription_ids(&self) -> HashSet<u64> {
        self.tables
            .subscriptions
            .iter()
            .filter(|s| s.incognito && s.is_enabled())
            .map(|s| s.id)
            .collect()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            tracing::debug!("Rolling back uncommitted transaction");
            *self.tables = snapshot;
        }
    }
}
