//! Live subscriptions, keyed by subscription id.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::handler::MessageHandler;

/// A registered subscription.
///
/// Cloning is cheap; the handler is shared.
#[derive(Clone)]
pub struct Subscription {
    id: String,
    destination: String,
    handler: Arc<dyn MessageHandler>,
}

impl Subscription {
    /// Create a new subscription.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        destination: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            handler,
        }
    }

    /// The subscription id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The subscribed destination.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The message handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn MessageHandler> {
        &self.handler
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

/// Concurrent map from subscription id to subscription.
///
/// Lookups return clones so no shard lock is held while a handler runs.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: DashMap<String, Subscription>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription, replacing any entry with the same id.
    pub fn insert(&self, subscription: Subscription) {
        debug!(
            subscription = %subscription.id,
            destination = %subscription.destination,
            "Registered subscription"
        );
        self.subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> Option<Subscription> {
        let removed = self.subscriptions.remove(id).map(|(_, s)| s);
        if removed.is_some() {
            debug!(subscription = %id, "Removed subscription");
        }
        removed
    }

    /// Look up a subscription.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Subscription> {
        self.subscriptions.get(id).map(|entry| entry.value().clone())
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Check if no subscriptions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Destinations with at least one subscription.
    #[must_use]
    pub fn destinations(&self) -> Vec<String> {
        let mut destinations: Vec<String> = self
            .subscriptions
            .iter()
            .map(|e| e.value().destination.clone())
            .collect();
        destinations.sort();
        destinations.dedup();
        destinations
    }

    /// Remove every subscription.
    pub fn clear(&self) {
        self.subscriptions.clear();
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("len", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StompMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop() -> Arc<dyn MessageHandler> {
        Arc::new(|_: StompMessage| {})
    }

    #[test]
    fn test_registry_insert_remove() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.is_empty());

        registry.insert(Subscription::new("sub-1", "/topic/a", noop()));
        registry.insert(Subscription::new("sub-2", "/topic/b", noop()));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("sub-1").is_some());
        assert_eq!(registry.get("sub-2").unwrap().destination(), "/topic/b");

        assert!(registry.remove("sub-1").is_some());
        assert!(registry.get("sub-1").is_none());

        // Removing an unknown id is a no-op
        assert!(registry.remove("sub-1").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_destinations() {
        let registry = SubscriptionRegistry::new();
        registry.insert(Subscription::new("sub-1", "/topic/b", noop()));
        registry.insert(Subscription::new("sub-2", "/topic/a", noop()));
        registry.insert(Subscription::new("sub-3", "/topic/a", noop()));

        assert_eq!(registry.destinations(), vec!["/topic/a", "/topic/b"]);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_handler_shared() {
        let registry = SubscriptionRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        registry.insert(Subscription::new(
            "sub-1",
            "/queue/q",
            Arc::new(move |_: StompMessage| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        ));

        let sub = registry.get("sub-1").unwrap();
        // The handler may touch the registry without deadlocking.
        registry.remove(sub.id());
        sub.handler()
            .on_message(StompMessage::new(None, "x", Default::default()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_concurrent_access() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let id = format!("sub-{}-{}", t, i);
                        registry.insert(Subscription::new(id.clone(), "/topic/x", noop()));
                        assert!(registry.get(&id).is_some());
                        if i % 2 == 0 {
                            registry.remove(&id);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 8 * 50);
    }
}
