//! Entity graph synchronization
//!
//! The local replica of the subscription graph and the actors that keep it
//! aligned with the reconciled storage modifications and the remote API:
//!
//! * [`model`] — the entities and their membership-list invariants.
//! * [`db`] — the in-memory transactional store they live in.
//! * [`accounts`] — applies `ACCOUNT_*` modifications.
//! * [`incognito`] — serves add requests and applies `CHANNEL_*`/
//!   `PLAYLIST_*` modifications.
//! * [`subscriptions`] — reconciles an account's remote subscription list.
//! * [`refresh`] — ingests new videos and view counts.
//! * [`videos`] — the cached enabled flag and the deletion cascades.

pub mod accounts;
pub mod db;
pub mod error;
pub mod incognito;
pub mod model;
pub mod refresh;
pub mod subscriptions;
pub mod videos;

pub use accounts::{AccountsSynchronizer, STATUS_ADDED, STATUS_AUTHORIZATION_REJECTED};
pub use db::{Database, Transaction};
pub use error::GraphError;
pub use incognito::{
    IncognitoSubscriptionManager, IncognitoSubscriptionsSynchronizer, STATUS_DUPLICATE, STATUS_OK,
};
pub use model::{
    Account, AccountState, Channel, Membership, Playlist, Subscription, SubscriptionKind,
    SubscriptionState, Video,
};
pub use refresh::VideoFetcher;
pub use subscriptions::SubscriptionsFetcher;
