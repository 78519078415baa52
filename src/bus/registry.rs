//! Actor registry
//!
//! Extends the event bus with actor registration: every topic in an actor's
//! registration table is subscribed with a wrapper that runs the handler on
//! the runtime, forwards results to the dispatch completion, and converts
//! handler errors into failure replies (for `ask`-style callers) or log
//! lines (for `tell`-style callers) so one misbehaving actor cannot crash
//! the bus or its siblings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::message::Payload;
use crate::topics;

use super::actor::Actor;
use super::error::BusError;
use super::event_bus::EventBus;
use super::router::{Listener, ListenerId};

/// Event bus with an actor population.
pub struct ActorBus {
    bus: Arc<EventBus>,
    actors: Mutex<HashMap<&'static str, Registration>>,
}

struct Registration {
    actor: Arc<dyn Actor>,
    listeners: Vec<ListenerId>,
}

impl ActorBus {
    pub fn new() -> Self {
        Self::with_bus(Arc::new(EventBus::new()))
    }

    /// Wraps an existing bus, so plain listeners and actors can share it.
    pub fn with_bus(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            actors: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying event bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Registers an actor: subscribes its declared topics, binds its mailbox
    /// and fires `event-bus.actor-registered`. Registering an actor whose
    /// name is already present is a no-op.
    pub fn register(&self, actor: Arc<dyn Actor>) -> Result<(), BusError> {
        let mut actors = self.actors.lock().unwrap();
        if actors.contains_key(actor.name()) {
            return Ok(());
        }

        tracing::debug!(actor = %actor.name(), "Registering actor");

        let mut listeners = Vec::with_capacity(actor.topics().len());
        for observed in actor.topics() {
            let wrapper = Self::wrap_handler(Arc::clone(&actor));
            match self.bus.add_listener(observed, wrapper) {
                Ok(id) => listeners.push(id),
                Err(error) => {
                    for id in listeners {
                        self.bus.remove_listener(id);
                    }
                    return Err(error);
                }
            }
        }

        if let Err(error) = actor.mailbox().bind(Arc::clone(&self.bus)) {
            for id in listeners {
                self.bus.remove_listener(id);
            }
            return Err(error);
        }

        let name = actor.name();
        actors.insert(name, Registration { actor, listeners });
        drop(actors);

        self.bus
            .fire(topics::ACTOR_REGISTERED, Payload::Text(name.to_string()))?;
        tracing::info!(actor = %name, "Actor registered");
        Ok(())
    }

    /// Unregisters an actor by name: removes every derived listener, unbinds
    /// the mailbox and fires `event-bus.actor-unregistered`. A no-op when the
    /// name is unknown.
    pub fn unregister(&self, name: &str) -> Result<(), BusError> {
        let registration = match self.actors.lock().unwrap().remove(name) {
            Some(registration) => registration,
            None => return Ok(()),
        };

        for id in registration.listeners {
            self.bus.remove_listener(id);
        }
        registration.actor.mailbox().unbind()?;

        self.bus
            .fire(topics::ACTOR_UNREGISTERED, Payload::Text(name.to_string()))?;
        tracing::info!(actor = %name, "Actor unregistered");
        Ok(())
    }

    fn wrap_handler(actor: Arc<dyn Actor>) -> Listener {
        Arc::new(move |fired: &str, data: &Payload, completion| {
            let actor = Arc::clone(&actor);
            let fired = fired.to_string();
            let data = data.clone();

            tokio::spawn(async move {
                match actor.handle(&fired, data).await {
                    Ok(Some(reply)) => {
                        if let Some(complete) = completion {
                            complete(reply);
                        }
                    }
                    Ok(None) => {}
                    Err(error) => {
                        if let Some(complete) = completion {
                            tracing::warn!(
                                actor = %actor.name(),
                                topic = %fired,
                                error = %error,
                                "Actor handler failed, forwarding error to caller"
                            );
                            complete(Payload::Failure(error.to_string()));
                        } else {
                            tracing::error!(
                                actor = %actor.name(),
                                topic = %fired,
                                error = %error,
                                "Actor handler failed, no caller to notify"
                            );
                        }
                    }
                }
            });
        })
    }
}

impl Default for ActorBus {
    fn default() -> Self {
        Self::new()
    }
}
