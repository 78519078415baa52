//! Topic router
//!
//! Listeners are stored in a tree keyed by topic segment, with each node
//! holding its own direct listeners. Resolution gathers the exact-path
//! listeners plus the wildcard listeners registered one level above the fired
//! topic (depth-one wildcard matching: `"x.*"` matches `"x.y"` but not
//! `"x.y.z"`).

use std::collections::HashMap;
use std::sync::Arc;

use crate::message::Payload;

use super::error::BusError;
use super::topic;

/// Identifier handed out by [`TopicRouter::add`], used for removal.
pub type ListenerId = u64;

/// Completion function passed to listeners during a dispatch. Invoking it
/// schedules the dispatcher's callback asynchronously.
pub type Completion = Arc<dyn Fn(Payload) + Send + Sync>;

/// A registered listener. Receives the fired topic, the payload, and the
/// completion function when the topic was dispatched rather than fired.
pub type Listener = Arc<dyn Fn(&str, &Payload, Option<Completion>) + Send + Sync>;

struct Entry {
    id: ListenerId,
    listener: Listener,
}

#[derive(Default)]
struct Node {
    listeners: Vec<Entry>,
    children: HashMap<String, Node>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.children.is_empty()
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        let mut removed = self.listeners.len() != before;

        let mut emptied = Vec::new();
        for (segment, child) in self.children.iter_mut() {
            if child.remove(id) {
                removed = true;
            }
            if child.is_empty() {
                emptied.push(segment.clone());
            }
        }
        for segment in emptied {
            self.children.remove(&segment);
        }

        removed
    }
}

/// Tree of topic segments to listener lists.
///
/// Purely synchronous; the [`EventBus`](super::EventBus) wraps it in a lock
/// and drops the lock before invoking any listener.
pub struct TopicRouter {
    root: Node,
    next_id: ListenerId,
}

impl TopicRouter {
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            next_id: 1,
        }
    }

    /// Registers a listener under a subscription topic.
    ///
    /// Returns the id to use with [`remove`](Self::remove). Fails on empty
    /// topics and misplaced wildcards.
    pub fn add(&mut self, subscription: &str, listener: Listener) -> Result<ListenerId, BusError> {
        let segments = topic::subscription_segments(subscription)?;

        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_default();
        }

        let id = self.next_id;
        self.next_id += 1;
        node.listeners.push(Entry { id, listener });

        Ok(id)
    }

    /// Removes a listener anywhere in the tree. Returns `false` (a no-op)
    /// when the id is unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.root.remove(id)
    }

    /// Resolves the listeners matching a fired topic: the exact path plus the
    /// wildcard slot at the parent prefix, in registration order.
    pub fn resolve(&self, fired: &str) -> Result<Vec<Listener>, BusError> {
        let segments = topic::fired_segments(fired)?;

        let mut matched: Vec<(ListenerId, Listener)> = Vec::new();

        let mut node = Some(&self.root);
        for segment in &segments {
            node = node.and_then(|n| n.children.get(*segment));
        }
        if let Some(exact) = node {
            for entry in &exact.listeners {
                matched.push((entry.id, Arc::clone(&entry.listener)));
            }
        }

        // wildcard slot one level above the fired topic
        let mut parent = Some(&self.root);
        for segment in &segments[..segments.len() - 1] {
            parent = parent.and_then(|n| n.children.get(*segment));
        }
        if let Some(wildcard) = parent.and_then(|n| n.children.get(topic::WILDCARD)) {
            for entry in &wildcard.listeners {
                matched.push((entry.id, Arc::clone(&entry.listener)));
            }
        }

        matched.sort_by_key(|(id, _)| *id);
        Ok(matched.into_iter().map(|(_, listener)| listener).collect())
    }
}

impl Default for TopicRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter_listener(counter: Arc<AtomicUsize>) -> Listener {
        Arc::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn invoke(router: &TopicRouter, fired: &str) -> usize {
        let listeners = router.resolve(fired).unwrap();
        let count = listeners.len();
        for listener in listeners {
            listener(fired, &Payload::None, None);
        }
        count
    }

    #[test]
    fn test_exact_match() {
        let mut router = TopicRouter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        router.add("a.b.c", counter_listener(hits.clone())).unwrap();

        assert_eq!(invoke(&router, "a.b.c"), 1);
        assert_eq!(invoke(&router, "a.b"), 0);
        assert_eq!(invoke(&router, "a.b.c.d"), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wildcard_matches_one_level_only() {
        let mut router = TopicRouter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        router.add("x.*", counter_listener(hits.clone())).unwrap();

        assert_eq!(invoke(&router, "x.y"), 1);
        assert_eq!(invoke(&router, "x.z"), 1);
        assert_eq!(invoke(&router, "x.y.z"), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_root_wildcard_matches_single_segment_topics() {
        let mut router = TopicRouter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        router.add("*", counter_listener(hits.clone())).unwrap();

        assert_eq!(invoke(&router, "start"), 1);
        assert_eq!(invoke(&router, "a.b"), 0);
    }

    #[test]
    fn test_exact_and_wildcard_in_registration_order() {
        let mut router = TopicRouter::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = order.clone();
        router
            .add(
                "a.*",
                Arc::new(move |_, _, _| first.lock().unwrap().push("wildcard")),
            )
            .unwrap();
        let second = order.clone();
        router
            .add(
                "a.b",
                Arc::new(move |_, _, _| second.lock().unwrap().push("exact")),
            )
            .unwrap();

        invoke(&router, "a.b");
        // the wildcard listener was registered first, so it runs first
        assert_eq!(*order.lock().unwrap(), vec!["wildcard", "exact"]);
    }

    #[test]
    fn test_removed_listener_never_invoked() {
        let mut router = TopicRouter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = router.add("a.b", counter_listener(hits.clone())).unwrap();

        assert!(router.remove(id));
        assert_eq!(invoke(&router, "a.b"), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut router = TopicRouter::new();
        assert!(!router.remove(42));
    }

    #[test]
    fn test_resolve_rejects_wildcard_topic() {
        let router = TopicRouter::new();
        assert!(matches!(
            router.resolve("a.*"),
            Err(BusError::WildcardFired(_))
        ));
    }
}
