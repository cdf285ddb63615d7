//! Domain data structures for appointment types, locations, subscriptions, and slots.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Appointment category offered by the booking site.
pub struct AppointmentType {
    /// Display name, also used as lookup key.
    pub name: String,
    /// Numeric code used in the booking URL.
    pub code: u32,
}

impl AppointmentType {
    /// Construct a new appointment type.
    #[must_use]
    pub fn new<S: Into<String>>(name: S, code: u32) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Office offering a given appointment type. Codes are scoped to one type.
pub struct Location {
    /// Display name, also used as lookup key.
    pub name: String,
    /// Numeric code used in the booking URL.
    pub code: u32,
}

impl Location {
    /// Construct a new location.
    #[must_use]
    pub fn new<S: Into<String>>(name: S, code: u32) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Opaque identity of a subscriber on the chat platform.
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// An (appointment type, location) pair a subscriber wants to hear about.
pub struct SubscriptionKey {
    /// Appointment type name.
    pub appointment_type: String,
    /// Location name within that type.
    pub location: String,
}

impl SubscriptionKey {
    /// Construct a new subscription key.
    #[must_use]
    pub fn new<T: Into<String>, L: Into<String>>(appointment_type: T, location: L) -> Self {
        Self {
            appointment_type: appointment_type.into(),
            location: location.into(),
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} @ {}", self.appointment_type, self.location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Resolved numeric codes for one booking page.
pub struct FetchTarget {
    /// Appointment type code.
    pub type_code: u32,
    /// Location code.
    pub location_code: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Slot as extracted from a booking page, before it is tied to a subscription.
pub struct RawSlot {
    /// Absolute booking URL.
    pub url: String,
    /// Date segment taken from the URL.
    pub date: String,
    /// Time label, already formatted (for example `09:25AM`).
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Bookable appointment discovered during a poll cycle. Identity is the URL.
pub struct Slot {
    /// Absolute booking URL.
    pub url: String,
    /// Date segment taken from the URL.
    pub date: String,
    /// Formatted time label.
    pub time: String,
    /// Owning appointment type name.
    pub appointment_type: String,
    /// Owning location name.
    pub location: String,
}

impl Slot {
    /// Attach a raw slot to the subscription pair it was fetched for.
    #[must_use]
    pub fn from_raw(raw: RawSlot, key: &SubscriptionKey) -> Self {
        Self {
            url: raw.url,
            date: raw.date,
            time: raw.time,
            appointment_type: key.appointment_type.clone(),
            location: key.location.clone(),
        }
    }

    /// Subscription pair this slot belongs to.
    #[must_use]
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.appointment_type.clone(), self.location.clone())
    }

    /// Chronological ordering by (date, time), with the URL as tie breaker.
    #[must_use]
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        (&self.date, &self.time, &self.url).cmp(&(&other.date, &other.time, &other.url))
    }
}
