//! Stable topic-name contract
//!
//! Every topic fired by this crate, in one place. These strings are part of
//! the public API: embedders subscribe to them directly.

/// Fired once when the background core starts; actors acquire their runtime
/// resources in response.
pub const BACKGROUND_START: &str = "background.start";

/// Fired once when the background core shuts down.
pub const BACKGROUND_END: &str = "background.end";

/// Heartbeats emitted by the [`Timer`](crate::heartbeat::Timer) actor while
/// the background is running. Payload is [`Payload::Elapsed`] milliseconds.
pub const HEARTBEAT_MINUTE: &str = "heartbeat.minute";
pub const HEARTBEAT_QUARTER_OF_HOUR: &str = "heartbeat.quarter-of-hour";
pub const HEARTBEAT_HOUR: &str = "heartbeat.hour";

/// Actor lifecycle topics fired by the [`ActorBus`](crate::bus::ActorBus).
/// Payload is [`Payload::Text`] with the actor name.
pub const ACTOR_REGISTERED: &str = "event-bus.actor-registered";
pub const ACTOR_UNREGISTERED: &str = "event-bus.actor-unregistered";

/// Request topic served by the incognito subscription manager. Payload is
/// [`Payload::Text`] with a YouTube channel/user/playlist URL; the reply is
/// `"ok"` or `"duplicate"`.
pub const INCOGNITO_SUBSCRIPTIONS_ADD_REQUESTED: &str = "incognito-subscriptions.add-requested";

/// Modification topics fired by the sync storage gateway after reconciling an
/// external store change. Payload is [`Payload::Resource`].
pub mod storage {
    pub const ACCOUNT_ADDED: &str = "storage.sync.ACCOUNT_ADDED";
    pub const ACCOUNT_ENABLED: &str = "storage.sync.ACCOUNT_ENABLED";
    pub const ACCOUNT_DISABLED: &str = "storage.sync.ACCOUNT_DISABLED";
    pub const ACCOUNT_REMOVED: &str = "storage.sync.ACCOUNT_REMOVED";

    pub const CHANNEL_ADDED: &str = "storage.sync.CHANNEL_ADDED";
    pub const CHANNEL_ENABLED: &str = "storage.sync.CHANNEL_ENABLED";
    pub const CHANNEL_DISABLED: &str = "storage.sync.CHANNEL_DISABLED";
    pub const CHANNEL_REMOVED: &str = "storage.sync.CHANNEL_REMOVED";

    pub const PLAYLIST_ADDED: &str = "storage.sync.PLAYLIST_ADDED";
    pub const PLAYLIST_ENABLED: &str = "storage.sync.PLAYLIST_ENABLED";
    pub const PLAYLIST_DISABLED: &str = "storage.sync.PLAYLIST_DISABLED";
    pub const PLAYLIST_REMOVED: &str = "storage.sync.PLAYLIST_REMOVED";
}

/// Completion topics fired by the entity-graph synchronizers once the local
/// replica reflects a storage modification. Payload is [`Payload::Account`].
pub mod synchronization {
    pub const ACCOUNT_ADDED: &str = "storage.synchronization.ACCOUNT_ADDED";
    pub const ACCOUNT_ENABLED: &str = "storage.synchronization.ACCOUNT_ENABLED";
}
