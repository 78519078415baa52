//! Event bus error types

use std::time::Duration;

/// Error type for event bus and actor operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Topic name is empty
    EmptyTopic,
    /// A topic segment is empty (leading, trailing or doubled dot)
    EmptySegment(String),
    /// The `*` wildcard appears somewhere other than the final segment
    WildcardNotLast(String),
    /// A topic containing `*` was fired or dispatched
    WildcardFired(String),
    /// A timeout or period of zero was supplied
    InvalidTimeout,
    /// No reply arrived within the deadline
    Timeout(Duration),
    /// A listener replied with a failure payload
    Rejected(String),
    /// The actor is already bound to an event bus
    AlreadyBound,
    /// The actor is not bound to an event bus
    NotBound,
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::EmptyTopic => write!(f, "Topic name cannot be empty"),
            BusError::EmptySegment(topic) => {
                write!(f, "Topic contains an empty segment: {}", topic)
            }
            BusError::WildcardNotLast(topic) => {
                write!(f, "The * wildcard may only be the final segment: {}", topic)
            }
            BusError::WildcardFired(topic) => {
                write!(f, "Wildcards are a subscription concept, cannot fire: {}", topic)
            }
            BusError::InvalidTimeout => write!(f, "Timeout must be positive"),
            BusError::Timeout(duration) => {
                write!(f, "No reply within {} ms", duration.as_millis())
            }
            BusError::Rejected(reason) => write!(f, "Listener replied with an error: {}", reason),
            BusError::AlreadyBound => write!(f, "Actor is already bound to an event bus"),
            BusError::NotBound => write!(f, "Actor is not bound to an event bus"),
        }
    }
}

impl std::error::Error for BusError {}
