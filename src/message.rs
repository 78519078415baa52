//! Payloads carried by the event bus
//!
//! A single closed enum instead of an open `Any`-style payload: every topic
//! in the crate carries one of these variants, so handlers can match
//! exhaustively and replies stay typed end to end.

use serde::{Deserialize, Serialize};

use crate::graph::model::{Account, Subscription};

/// Data attached to a fired or dispatched topic.
///
/// Cheap to clone; entity-carrying variants clone the entity itself, which is
/// small (string ids and metadata, no media).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// No data.
    None,
    /// A resource id, used by the sync-storage modification topics.
    Resource {
        /// Account, channel or playlist id, depending on the topic.
        id: String,
    },
    /// Free-form text: status strings ("ADDED", "duplicate", ...), actor
    /// names on the lifecycle topics, URLs on request topics.
    Text(String),
    /// Milliseconds elapsed since `background.start`, on heartbeat topics.
    Elapsed(u64),
    /// A persisted account entity, on synchronizer completion topics.
    Account(Account),
    /// A resolved or persisted subscription entity.
    Subscription(Subscription),
    /// An error reply. `ask` callers receive this as a rejection.
    Failure(String),
}

impl Payload {
    /// Whether this payload is an error reply.
    pub fn is_failure(&self) -> bool {
        matches!(self, Payload::Failure(_))
    }

    /// The resource id, if this is a `Resource` payload.
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Payload::Resource { id } => Some(id),
            _ => None,
        }
    }

    /// The text, if this is a `Text` payload.
    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::None
    }
}
