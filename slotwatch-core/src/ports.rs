//! Traits describing the slot source and notification sink, plus their shared error type.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::digest::PresentableDigest;
use crate::model::{FetchTarget, RawSlot, SubscriberId};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the booking site or a notification sink.
pub enum PortError {
    /// Network layer failed, or the site answered with a non-success status.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The booking page had no timeslot container.
    #[error("Slot container missing from booking page")]
    MissingContainer,
    /// The sink could not reach the subscriber.
    #[error("Delivery failed: {0}")]
    Delivery(String),
    /// Internal provider error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Trait for site-specific booking page fetchers.
pub trait SlotSource: Send + Sync {
    /// Fetch the currently bookable slots for one (type, location) booking page.
    ///
    /// Malformed individual slots are skipped by the implementation; only
    /// page-level failures are reported as errors.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails, the site answers with a
    /// non-success status, or the page has no slot container.
    async fn fetch(&self, target: FetchTarget) -> Result<Vec<RawSlot>, PortError>;
}

#[async_trait]
/// Trait for delivering formatted digests to subscribers.
pub trait NotificationSink: Send + Sync {
    /// Deliver one digest to one subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Delivery`] (or a transport error) when the
    /// subscriber cannot be reached.
    async fn deliver(
        &self,
        subscriber: SubscriberId,
        digest: &PresentableDigest,
    ) -> Result<(), PortError>;
}
