//! Event bus
//!
//! Public API over the topic router: `fire` (no reply expected), `dispatch`
//! (broadcast with an optional reply callback) and `await_once` (wait for the
//! next occurrence of a topic with a timeout).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::message::Payload;

use super::error::BusError;
use super::router::{Completion, Listener, ListenerId, TopicRouter};

/// Reply callback supplied to [`EventBus::dispatch`]. May be invoked more
/// than once when several listeners answer.
pub type Callback = Arc<dyn Fn(Payload) + Send + Sync>;

/// Single-process, in-memory event bus.
///
/// The router lock is held only while resolving or mutating the listener
/// tree, never while a listener runs, so listeners are free to register and
/// remove listeners themselves.
pub struct EventBus {
    router: Mutex<TopicRouter>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            router: Mutex::new(TopicRouter::new()),
        }
    }

    /// Registers a listener. See [`TopicRouter::add`] for topic validation.
    pub fn add_listener(&self, subscription: &str, listener: Listener) -> Result<ListenerId, BusError> {
        self.router.lock().unwrap().add(subscription, listener)
    }

    /// Removes a listener; a no-op when the id is unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.router.lock().unwrap().remove(id)
    }

    /// Fires a topic with no reply expected.
    ///
    /// Matched listeners run synchronously in registration order. A topic
    /// nobody observes is logged as a warning, since it usually means a
    /// component was never registered.
    pub fn fire(&self, topic: &str, data: Payload) -> Result<(), BusError> {
        self.deliver(topic, data, None)
    }

    /// Dispatches a topic, passing every matched listener a completion
    /// function that forwards its argument to `callback`.
    ///
    /// The completion defers through the runtime, so `callback` is never
    /// invoked before `dispatch` has returned, even when a listener completes
    /// synchronously. Callers that need exactly one reply must design the
    /// topic to have exactly one handler.
    pub fn dispatch(
        &self,
        topic: &str,
        data: Payload,
        callback: Option<Callback>,
    ) -> Result<(), BusError> {
        let completion: Option<Completion> = callback.map(|cb| {
            Arc::new(move |reply: Payload| {
                let cb = Arc::clone(&cb);
                tokio::spawn(async move {
                    cb(reply);
                });
            }) as Completion
        });

        self.deliver(topic, data, completion)
    }

    /// Waits for the next occurrence of `topic`, resolving with its payload.
    ///
    /// The transient listener is removed on fire-or-timeout; a fire arriving
    /// after the timeout is dropped silently. The timeout must be positive.
    pub async fn await_once(&self, topic: &str, timeout: Duration) -> Result<Payload, BusError> {
        if timeout.is_zero() {
            return Err(BusError::InvalidTimeout);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener: Listener = Arc::new(move |_, data: &Payload, _| {
            let _ = tx.send(data.clone());
        });
        let id = self.add_listener(topic, listener)?;

        let result = tokio::time::timeout(timeout, rx.recv()).await;
        self.remove_listener(id);

        match result {
            Ok(Some(payload)) => Ok(payload),
            // the sender lives in the router until removal, so the channel
            // cannot close before the timeout
            Ok(None) | Err(_) => Err(BusError::Timeout(timeout)),
        }
    }

    fn deliver(
        &self,
        topic: &str,
        data: Payload,
        completion: Option<Completion>,
    ) -> Result<(), BusError> {
        let listeners = self.router.lock().unwrap().resolve(topic)?;

        if listeners.is_empty() {
            tracing::warn!(topic = %topic, "Topic was not captured by any listener");
            return Ok(());
        }

        tracing::debug!(topic = %topic, listeners = listeners.len(), "Delivering topic");
        for listener in listeners {
            listener(topic, &data, completion.clone());
        }

        Ok(())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
