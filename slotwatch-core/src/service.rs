//! High-level facade the command layer calls into.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::catalog::{Catalog, CatalogError};
use crate::model::{SubscriberId, SubscriptionKey};
use crate::registry::SubscriptionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of an unsubscribe request.
pub struct Unsubscribed {
    /// Keys that were actually removed.
    pub removed: usize,
    /// Keys the subscriber still holds afterwards.
    pub remaining: usize,
}

/// Public entry point for managing subscriptions.
///
/// Every call returns without waiting on the poll loop.
pub struct SlotWatchService {
    catalog: Arc<Catalog>,
    registry: Arc<SubscriptionRegistry>,
}

impl SlotWatchService {
    /// Create a new service bound to the provided catalog and registry.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self { catalog, registry }
    }

    /// Appointment type names in catalog order.
    #[must_use]
    pub fn appointment_types(&self) -> Vec<String> {
        self.catalog
            .appointment_types()
            .map(|appointment_type| appointment_type.name.clone())
            .collect()
    }

    /// Location names for an appointment type in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownType`] when the type is not in the catalog.
    pub fn locations_for(&self, appointment_type: &str) -> Result<Vec<String>, CatalogError> {
        Ok(self
            .catalog
            .locations_for(appointment_type)?
            .into_iter()
            .map(str::to_owned)
            .collect())
    }

    /// Subscribe to one appointment type at several locations.
    ///
    /// Every location is validated first; on error nothing is added.
    /// Returns the keys that were newly added.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when the type or any location is unknown.
    pub fn subscribe<S: AsRef<str>>(
        &self,
        subscriber: SubscriberId,
        appointment_type: &str,
        locations: &[S],
    ) -> Result<Vec<SubscriptionKey>, CatalogError> {
        let keys = locations
            .iter()
            .map(|location| -> Result<SubscriptionKey, CatalogError> {
                let location = location.as_ref();
                self.catalog.location_code(appointment_type, location)?;
                Ok(SubscriptionKey::new(appointment_type, location))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let added: Vec<SubscriptionKey> = keys
            .into_iter()
            .filter(|key| self.registry.add(subscriber, key.clone()))
            .collect();
        info!(%subscriber, appointment_type, added = added.len(), "Subscribed");
        Ok(added)
    }

    /// Subscribe to one appointment type at every location offering it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownType`] when the type is not in the catalog.
    pub fn subscribe_all_locations(
        &self,
        subscriber: SubscriberId,
        appointment_type: &str,
    ) -> Result<Vec<SubscriptionKey>, CatalogError> {
        let locations = self.catalog.locations_for(appointment_type)?;
        self.subscribe(subscriber, appointment_type, locations.as_slice())
    }

    /// Remove the given keys from a subscriber.
    pub fn unsubscribe(&self, subscriber: SubscriberId, keys: &[SubscriptionKey]) -> Unsubscribed {
        let removed = keys
            .iter()
            .filter(|key| self.registry.remove(subscriber, key))
            .count();
        let remaining = self.registry.list(subscriber).len();
        info!(%subscriber, removed, remaining, "Unsubscribed");
        Unsubscribed { removed, remaining }
    }

    /// Current subscriptions of a subscriber.
    #[must_use]
    pub fn subscriptions(&self, subscriber: SubscriberId) -> BTreeSet<SubscriptionKey> {
        self.registry.list(subscriber)
    }

    /// Drop every subscription of a subscriber. Returns how many were dropped.
    pub fn clear_all(&self, subscriber: SubscriberId) -> usize {
        let cleared = self.registry.remove_all(subscriber);
        info!(%subscriber, cleared, "Cleared subscriptions");
        cleared
    }
}
