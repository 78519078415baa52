//! Topic name validation
//!
//! Topics are non-empty strings of dot-separated segments, e.g.
//! `"account.enabled"`. A subscription may end with a single `*` wildcard
//! segment; fired topics must not contain `*` at all.

use super::error::BusError;

/// The wildcard segment, legal only as the final segment of a subscription.
pub const WILDCARD: &str = "*";

/// Splits a topic into segments, rejecting empty topics and empty segments.
pub fn split(topic: &str) -> Result<Vec<&str>, BusError> {
    if topic.is_empty() {
        return Err(BusError::EmptyTopic);
    }

    let segments: Vec<&str> = topic.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(BusError::EmptySegment(topic.to_string()));
    }

    Ok(segments)
}

/// Validates a subscription topic and returns its segments.
///
/// The `*` wildcard is accepted as the final segment only; a `*` embedded in
/// any other segment, or in a non-final position, is rejected.
pub fn subscription_segments(topic: &str) -> Result<Vec<&str>, BusError> {
    let segments = split(topic)?;

    let last = segments.len() - 1;
    for (index, segment) in segments.iter().enumerate() {
        if segment.contains('*') && (*segment != WILDCARD || index != last) {
            return Err(BusError::WildcardNotLast(topic.to_string()));
        }
    }

    Ok(segments)
}

/// Validates a fired/dispatched topic and returns its segments.
pub fn fired_segments(topic: &str) -> Result<Vec<&str>, BusError> {
    let segments = split(topic)?;

    if topic.contains('*') {
        return Err(BusError::WildcardFired(topic.to_string()));
    }

    Ok(segments)
}
