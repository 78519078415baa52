//! Actors
//!
//! An actor is a unit of business logic bound to exactly one event bus at a
//! time. It declares the topics it observes through an explicit registration
//! table ([`Actor::topics`]) and communicates outward through its
//! [`Mailbox`]: `tell` for fire-and-forget messages, `ask` for requests that
//! expect a reply.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::message::Payload;

use super::error::BusError;
use super::event_bus::EventBus;

/// Default `ask` reply deadline.
pub const DEFAULT_ASK_TIMEOUT: Duration = Duration::from_secs(15);

/// Error type actor handlers may return; the registry converts it into a
/// failure reply (when the caller asked) or a log line (when it told).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A message handler unit communicating only via the bus.
///
/// Implementations own a [`Mailbox`] and list their observed topics in
/// [`topics`](Actor::topics); [`handle`](Actor::handle) matches on the fired
/// topic exhaustively. Returning `Ok(Some(payload))` answers a dispatch
/// callback when one was provided; `Ok(None)` stays silent.
#[async_trait]
pub trait Actor: Send + Sync {
    /// Unique actor name, used as the registration key and in lifecycle
    /// topics.
    fn name(&self) -> &'static str;

    /// The registration table: every topic this actor observes.
    fn topics(&self) -> &'static [&'static str];

    /// The actor's outward-messaging capability, bound and unbound by the
    /// [`ActorBus`](super::ActorBus).
    fn mailbox(&self) -> &Mailbox;

    /// Handles one observed topic.
    async fn handle(&self, topic: &str, data: Payload) -> Result<Option<Payload>, HandlerError>;
}

/// Outward-messaging capability of an actor.
///
/// Holds the binding to at most one event bus. Binding while bound, or
/// unbinding while unbound, fails.
pub struct Mailbox {
    bus: Mutex<Option<Arc<EventBus>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            bus: Mutex::new(None),
        }
    }

    /// Binds this mailbox to an event bus.
    pub fn bind(&self, bus: Arc<EventBus>) -> Result<(), BusError> {
        let mut slot = self.bus.lock().unwrap();
        if slot.is_some() {
            return Err(BusError::AlreadyBound);
        }
        *slot = Some(bus);
        Ok(())
    }

    /// Cancels the binding.
    pub fn unbind(&self) -> Result<(), BusError> {
        let mut slot = self.bus.lock().unwrap();
        if slot.is_none() {
            return Err(BusError::NotBound);
        }
        *slot = None;
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.bus.lock().unwrap().is_some()
    }

    /// The bound bus, for components that spawn their own emitting tasks.
    pub fn bus(&self) -> Option<Arc<EventBus>> {
        self.bus.lock().unwrap().clone()
    }

    /// Schedules a fire on the bound bus, decoupling the caller from
    /// dispatch timing.
    pub fn tell(&self, topic: &'static str, data: Payload) -> Result<(), BusError> {
        let bus = self.bus().ok_or(BusError::NotBound)?;
        tokio::spawn(async move {
            if let Err(error) = bus.fire(topic, data) {
                tracing::error!(topic = %topic, error = %error, "Deferred fire failed");
            }
        });
        Ok(())
    }

    /// Schedules a dispatch and waits for the first reply.
    ///
    /// A failure reply rejects with [`BusError::Rejected`]; no reply within
    /// `timeout` rejects with [`BusError::Timeout`], after which late replies
    /// are dropped.
    pub async fn ask(
        &self,
        topic: &str,
        data: Payload,
        timeout: Duration,
    ) -> Result<Payload, BusError> {
        if timeout.is_zero() {
            return Err(BusError::InvalidTimeout);
        }
        let bus = self.bus().ok_or(BusError::NotBound)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.dispatch(
            topic,
            data,
            Some(Arc::new(move |reply| {
                // replies after the first (or after timeout) land in a
                // closed channel and are dropped
                let _ = tx.send(reply);
            })),
        )?;

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(Payload::Failure(reason))) => Err(BusError::Rejected(reason)),
            Ok(Some(reply)) => Ok(reply),
            Ok(None) | Err(_) => Err(BusError::Timeout(timeout)),
        }
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
