//! Synchronized list replication
//!
//! The cross-device resource lists live in a small external key/value store.
//! This module owns the whole pipeline around that store:
//!
//! ```text
//! +-----------+   change    +-----------+   diff    +-----------+
//! | SyncStore |-----------> |  codec +  |---------> | EventBus  |
//! | (external)|             | reconcile |  topics   | listeners |
//! +-----------+             +-----------+           +-----------+
//!       ^                                                 |
//!       |        read-modify-write under FIFO locks       |
//!       +------------- SyncStorageGateway <---------------+
//! ```
//!
//! * [`codec`] packs each resource class into one flat JSON array.
//! * [`reconcile`] diffs two decoded lists into discrete modifications.
//! * [`store`] abstracts the external store; [`store::MemorySyncStore`] is
//!   the in-process implementation.
//! * [`gateway`] serializes mutations per resource class and turns change
//!   notifications into `storage.sync.*` bus topics.

pub mod codec;
pub mod error;
pub mod gateway;
pub mod reconcile;
pub mod store;

pub use codec::{decode, encode, ResourceEntry};
pub use error::{CodecError, GatewayError, StoreError};
pub use gateway::{IncognitoTarget, QuotaUsage, SyncStorageGateway};
pub use reconcile::{reconcile, Modification, ModificationKind};
pub use store::{MemorySyncStore, StoreChange, SyncStore, QUOTA_BYTES, QUOTA_BYTES_PER_ITEM};
