//! Local replication of a YouTube subscription graph
//!
//! The crate keeps a local replica of a user's subscription graph —
//! accounts, channels, uploads playlists, subscriptions, videos —
//! synchronized against a YouTube data API and a small cross-device
//! key/value settings store.
//!
//! # Architecture
//!
//! ```text
//!   external store                     remote API / identity
//!        │ change (key, old, new)              ▲
//!        ▼                                     │
//!   SyncStorageGateway ── codec + reconcile    │
//!        │ storage.sync.* topics               │
//!        ▼                                     │
//!   EventBus ◄──── ActorBus ────► synchronizer actors
//!        │                              │
//!        │ completion topics            ▼
//!        ▼                        Database (entity graph)
//!   embedder listeners
//! ```
//!
//! * [`bus`] — topic router, event bus, actors and the actor registry.
//! * [`sync`] — list codec, diff engine, store trait and the gateway.
//! * [`graph`] — the entity graph, its transactional store and the
//!   synchronizer actors.
//! * [`api`] — the consumed remote API and identity capabilities.
//! * [`heartbeat`] — the timer actor driving periodic work.
//! * [`topics`] — the stable topic-name contract.

pub mod api;
pub mod bus;
pub mod graph;
pub mod heartbeat;
pub mod message;
pub mod sync;
pub mod topics;

pub use bus::{Actor, ActorBus, EventBus, Mailbox};
pub use graph::{AccountsSynchronizer, Database, SubscriptionsFetcher, VideoFetcher};
pub use message::Payload;
pub use sync::{MemorySyncStore, SyncStorageGateway, SyncStore};
