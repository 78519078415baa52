//! Actor-style event bus
//!
//! Routes dot-separated topic names to registered listeners with both
//! fire-and-forget and request/response semantics.
//!
//! # Architecture
//!
//! ```text
//!                 Arc<EventBus>
//!          ┌─────────────────────────┐
//!          │ router: TopicRouter {   │
//!          │   segment tree,         │
//!          │   per-node listeners    │
//!          │ }                       │
//!          └───────────┬─────────────┘
//!                      │ fire / dispatch / await_once
//!        ┌─────────────┼──────────────┐
//!        ▼             ▼              ▼
//!   [listener]    [Actor via      [await_once
//!                  ActorBus]       transient]
//!                      │
//!            mailbox.tell() / ask()
//! ```
//!
//! Listeners run synchronously in registration order; dispatch replies are
//! always deferred through the runtime so a dispatcher never observes its
//! callback before control returns to the event loop.

pub mod actor;
pub mod error;
pub mod event_bus;
pub mod registry;
pub mod router;
pub mod topic;

pub use actor::{Actor, HandlerError, Mailbox, DEFAULT_ASK_TIMEOUT};
pub use error::BusError;
pub use event_bus::{Callback, EventBus};
pub use registry::ActorBus;
pub use router::{Completion, Listener, ListenerId, TopicRouter};
