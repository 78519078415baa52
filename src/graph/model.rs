//! Entity model
//!
//! The local replica of the subscription graph. Relationships are id-list
//! membership rather than foreign keys: every [`Channel`], [`Playlist`] and
//! [`Video`] records which accounts and incognito subscriptions reference
//! it, and an entity whose both membership lists are empty is deleted
//! outright (the cascade rule).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountState {
    Active,
    Disabled,
    /// Placeholder for an account whose privileged data is unreachable.
    Unauthorized,
    Error,
}

/// Subscription lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionState {
    Active,
    Disabled,
    Error,
}

/// What an incognito subscription points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionKind {
    Channel,
    Playlist,
}

/// A managed YouTube account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub channel_id: Option<String>,
    pub title: Option<String>,
    pub state: AccountState,
    pub last_error: Option<String>,
    pub watch_history_playlist_id: Option<String>,
    pub watch_later_playlist_id: Option<String>,
}

impl Account {
    /// A minimal entity carrying only id and state, persisted when full
    /// account info is unreachable.
    pub fn placeholder(id: impl Into<String>, state: AccountState) -> Self {
        Self {
            id: id.into(),
            channel_id: None,
            title: None,
            state,
            last_error: None,
            watch_history_playlist_id: None,
            watch_later_playlist_id: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state == AccountState::Active
    }
}

/// A subscribed-to channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub uploads_playlist_id: Option<String>,
    pub account_ids: Vec<String>,
    pub incognito_subscription_ids: Vec<u64>,
}

/// A mirrored uploads playlist. Video-count changes trigger video fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub channel_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub video_count: u64,
    pub thumbnail: Option<String>,
    pub account_ids: Vec<String>,
    pub incognito_subscription_ids: Vec<u64>,
}

/// One subscription row: per (account, channel) or per incognito target.
///
/// Ids are assigned by the database on insert. Uniqueness for incognito
/// rows is enforced by scanning for an existing `(incognito, kind,
/// resource id)` match before insert, never by the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub kind: SubscriptionKind,
    pub channel_id: Option<String>,
    pub playlist_id: Option<String>,
    pub state: SubscriptionState,
    /// `None` for incognito subscriptions.
    pub account_id: Option<String>,
    pub incognito: bool,
}

impl Subscription {
    /// The external resource this subscription points at: the channel id
    /// for channel subscriptions, the playlist id otherwise.
    pub fn resource_id(&self) -> Option<&str> {
        match self.kind {
            SubscriptionKind::Channel => self.channel_id.as_deref(),
            SubscriptionKind::Playlist => self.playlist_id.as_deref(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state == SubscriptionState::Active
    }
}

/// A fetched video.
///
/// `enabled` is a derived, cached flag: true iff at least one referencing
/// account or incognito subscription is currently enabled. It exists so
/// listing videos is an index scan instead of a join, and is maintained by
/// the video storage reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
    pub view_count: u64,
    pub account_ids: Vec<String>,
    pub incognito_subscription_ids: Vec<u64>,
    pub watched: bool,
    pub enabled: bool,
    pub last_update: DateTime<Utc>,
}

/// Membership-list access shared by the cascading entities.
pub trait Membership {
    fn account_ids(&self) -> &[String];
    fn account_ids_mut(&mut self) -> &mut Vec<String>;
    fn incognito_subscription_ids(&self) -> &[u64];
    fn incognito_subscription_ids_mut(&mut self) -> &mut Vec<u64>;

    /// Whether both membership lists are empty, i.e. the entity is a
    /// deletion candidate.
    fn is_orphaned(&self) -> bool {
        self.account_ids().is_empty() && self.incognito_subscription_ids().is_empty()
    }

    /// Adds an account to the membership, returning whether it was new.
    fn add_account(&mut self, account_id: &str) -> bool {
        if self.account_ids().iter().any(|id| id == account_id) {
            return false;
        }
        self.account_ids_mut().push(account_id.to_string());
        true
    }

    /// Removes an account from the membership, returning whether it was
    /// present.
    fn remove_account(&mut self, account_id: &str) -> bool {
        let before = self.account_ids().len();
        self.account_ids_mut().retain(|id| id != account_id);
        self.account_ids().len() != before
    }

    fn add_incognito_subscription(&mut self, subscription_id: u64) -> bool {
        if self
            .incognito_subscription_ids()
            .contains(&subscription_id)
        {
            return false;
        }
        self.incognito_subscription_ids_mut().push(subscription_id);
        true
    }

    fn remove_incognito_subscription(&mut self, subscription_id: u64) -> bool {
        let before = self.incognito_subscription_ids().len();
        self.incognito_subscription_ids_mut()
            .retain(|id| *id != subscription_id);
        self.incognito_subscription_ids().len() != before
    }
}

macro_rules! impl_membership {
    ($entity:ty) => {
        impl Membership for $entity {
            fn account_ids(&self) -> &[String] {
                &self.account_ids
            }
            fn account_ids_mut(&mut self) -> &mut Vec<String> {
                &mut self.account_ids
            }
            fn incognito_subscription_ids(&self) -> &[u64] {
                &self.incognito_subscription_ids
            }
            fn incognito_subscription_ids_mut(&mut self) -> &mut Vec<u64> {
                &mut self.incognito_subscription_ids
            }
        }
    };
}

impl_membership!(Channel);
impl_membership!(Playlist);
impl_membership!(Video);

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Channel {
        Channel {
            id: "UC1".into(),
            title: "A channel".into(),
            thumbnail: None,
            uploads_playlist_id: None,
            account_ids: Vec::new(),
            incognito_subscription_ids: Vec::new(),
        }
    }

    #[test]
    fn test_membership_add_is_idempotent() {
        let mut channel = channel();
        assert!(channel.add_account("u1"));
        assert!(!channel.add_account("u1"));
        assert_eq!(channel.account_ids, vec!["u1"]);
    }

    #[test]
    fn test_orphaned_when_both_lists_empty() {
        let mut channel = channel();
        assert!(channel.is_orphaned());

        channel.add_account("u1");
        channel.add_incognito_subscription(7);
        assert!(!channel.is_orphaned());

        channel.remove_account("u1");
        assert!(!channel.is_orphaned());
        channel.remove_incognito_subscription(7);
        assert!(channel.is_orphaned());
    }

    #[test]
    fn test_placeholder_account_is_minimal() {
        let account = Account::placeholder("u1", AccountState::Unauthorized);
        assert_eq!(account.id, "u1");
        assert_eq!(account.state, AccountState::Unauthorized);
        assert_eq!(account.title, None);
        assert!(!account.is_enabled());
    }

    #[test]
    fn test_subscription_resource_id_follows_kind() {
        let subscription = Subscription {
            id: 1,
            kind: SubscriptionKind::Channel,
            channel_id: Some("UC1".into()),
            playlist_id: Some("PL1".into()),
            state: SubscriptionState::Active,
            account_id: None,
            incognito: true,
        };
        assert_eq!(subscription.resource_id(), Some("UC1"));

        let playlist = Subscription {
            kind: SubscriptionKind::Playlist,
            ..subscription
        };
        assert_eq!(playlist.resource_id(), Some("PL1"));
    }
}
