//! Lock-guarded mapping from subscribers to their subscription pairs.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::{SubscriberId, SubscriptionKey};

/// Point-in-time copy of the registry, taken at the start of a poll cycle.
pub type RegistrySnapshot = HashMap<SubscriberId, BTreeSet<SubscriptionKey>>;

#[derive(Debug, Default)]
/// Registry of subscriptions, safe to read from the poll loop while the
/// command layer writes to it.
///
/// A subscriber with no remaining keys is removed entirely.
pub struct SubscriptionRegistry {
    subscribers: RwLock<RegistrySnapshot>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a pair. Returns `false` if it was already subscribed.
    pub fn add(&self, subscriber: SubscriberId, key: SubscriptionKey) -> bool {
        self.write().entry(subscriber).or_default().insert(key)
    }

    /// Unsubscribe from a pair. Returns `false` if it was not subscribed.
    pub fn remove(&self, subscriber: SubscriberId, key: &SubscriptionKey) -> bool {
        let mut subscribers = self.write();
        let Some(keys) = subscribers.get_mut(&subscriber) else {
            return false;
        };
        let removed = keys.remove(key);
        if keys.is_empty() {
            subscribers.remove(&subscriber);
        }
        removed
    }

    /// Drop every subscription of a subscriber. Returns how many were dropped.
    pub fn remove_all(&self, subscriber: SubscriberId) -> usize {
        self.write()
            .remove(&subscriber)
            .map_or(0, |keys| keys.len())
    }

    /// Current subscriptions of a subscriber, empty when unknown.
    #[must_use]
    pub fn list(&self, subscriber: SubscriberId) -> BTreeSet<SubscriptionKey> {
        self.read().get(&subscriber).cloned().unwrap_or_default()
    }

    /// Every pair subscribed to by anyone, deduplicated.
    #[must_use]
    pub fn all_pairs(&self) -> BTreeSet<SubscriptionKey> {
        self.read().values().flatten().cloned().collect()
    }

    /// Consistent copy of the whole registry.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.read().clone()
    }

    /// Number of subscribers with at least one subscription.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.read().len()
    }

    // A panic while holding the lock cannot leave a half-updated set behind,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, RegistrySnapshot> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistrySnapshot> {
        self.subscribers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: SubscriberId = SubscriberId(1);
    const BOB: SubscriberId = SubscriberId(2);

    #[test]
    fn add_has_set_semantics() {
        let registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("REAL ID", "OAKLAND");

        assert!(registry.add(ALICE, key.clone()), "first add inserts");
        assert!(!registry.add(ALICE, key.clone()), "second add is a no-op");
        assert_eq!(registry.list(ALICE).len(), 1, "no duplicate keys");
    }

    #[test]
    fn add_then_remove_prunes_subscriber() {
        let registry = SubscriptionRegistry::new();
        let key = SubscriptionKey::new("REAL ID", "OAKLAND");

        registry.add(ALICE, key.clone());
        assert!(registry.remove(ALICE, &key), "key removed");

        assert!(!registry.list(ALICE).contains(&key), "key gone from list");
        assert!(registry.all_pairs().is_empty(), "no pairs left");
        assert_eq!(registry.subscriber_count(), 0, "empty subscriber pruned");
        assert!(!registry.remove(ALICE, &key), "removing again reports false");
    }

    #[test]
    fn all_pairs_deduplicates_across_subscribers() {
        let registry = SubscriptionRegistry::new();
        let shared = SubscriptionKey::new("REAL ID", "OAKLAND");
        let other = SubscriptionKey::new("REAL ID", "BAYONNE");

        registry.add(ALICE, shared.clone());
        registry.add(BOB, shared.clone());
        registry.add(BOB, other.clone());

        let pairs = registry.all_pairs();
        assert_eq!(pairs.len(), 2, "shared pair counted once");
        assert!(pairs.contains(&shared) && pairs.contains(&other), "both pairs present");
    }

    #[test]
    fn remove_all_reports_count() {
        let registry = SubscriptionRegistry::new();
        registry.add(ALICE, SubscriptionKey::new("REAL ID", "OAKLAND"));
        registry.add(ALICE, SubscriptionKey::new("REAL ID", "BAYONNE"));

        assert_eq!(registry.remove_all(ALICE), 2, "two keys dropped");
        assert_eq!(registry.remove_all(ALICE), 0, "nothing left to drop");
        assert!(registry.list(ALICE).is_empty(), "list is empty");
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let registry = SubscriptionRegistry::new();
        registry.add(ALICE, SubscriptionKey::new("REAL ID", "OAKLAND"));

        let snapshot = registry.snapshot();
        registry.remove_all(ALICE);

        assert_eq!(snapshot.get(&ALICE).map(BTreeSet::len), Some(1), "snapshot unchanged");
    }
}
