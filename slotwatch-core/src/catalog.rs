//! Read-only table of appointment types and the locations offering them.

use crate::model::{AppointmentType, FetchTarget, Location, SubscriptionKey};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Lookup failures against the [`Catalog`].
pub enum CatalogError {
    /// No appointment type with that name.
    #[error("Unknown appointment type: {0}")]
    UnknownType(String),
    /// The type exists but has no location with that name.
    #[error("Unknown location {location} for appointment type {appointment_type}")]
    UnknownLocation {
        /// Appointment type that was searched.
        appointment_type: String,
        /// Location name that was not found.
        location: String,
    },
}

#[derive(Debug, Clone)]
/// One appointment type together with its ordered locations.
pub struct CatalogEntry {
    /// The appointment type.
    pub appointment_type: AppointmentType,
    /// Locations offering this type, in display order.
    pub locations: Vec<Location>,
}

impl CatalogEntry {
    /// Build an entry from a type and its locations.
    #[must_use]
    pub fn new(appointment_type: AppointmentType, locations: Vec<Location>) -> Self {
        Self {
            appointment_type,
            locations,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Static mapping from names to the numeric codes used by the booking site.
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from the provided entries. Table order is preserved.
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// All appointment types in table order.
    pub fn appointment_types(&self) -> impl Iterator<Item = &AppointmentType> {
        self.entries.iter().map(|entry| &entry.appointment_type)
    }

    /// Code of the named appointment type.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownType`] when the name is not in the table.
    pub fn type_code(&self, name: &str) -> Result<u32, CatalogError> {
        self.entry(name).map(|entry| entry.appointment_type.code)
    }

    /// Code of the named location within the named appointment type.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownType`] or [`CatalogError::UnknownLocation`]
    /// when either name is not in the table.
    pub fn location_code(
        &self,
        appointment_type: &str,
        location: &str,
    ) -> Result<u32, CatalogError> {
        self.entry(appointment_type)?
            .locations
            .iter()
            .find(|candidate| candidate.name == location)
            .map(|found| found.code)
            .ok_or_else(|| CatalogError::UnknownLocation {
                appointment_type: appointment_type.to_owned(),
                location: location.to_owned(),
            })
    }

    /// Location names for an appointment type, in table order.
    ///
    /// A type the site lists without any locations yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownType`] when the type is not in the table.
    pub fn locations_for(&self, appointment_type: &str) -> Result<Vec<&str>, CatalogError> {
        Ok(self
            .entry(appointment_type)?
            .locations
            .iter()
            .map(|location| location.name.as_str())
            .collect())
    }

    /// Resolve a subscription key to the codes needed to fetch its booking page.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when the key references an unknown type or location.
    pub fn resolve(&self, key: &SubscriptionKey) -> Result<FetchTarget, CatalogError> {
        Ok(FetchTarget {
            type_code: self.type_code(&key.appointment_type)?,
            location_code: self.location_code(&key.appointment_type, &key.location)?,
        })
    }

    fn entry(&self, name: &str) -> Result<&CatalogEntry, CatalogError> {
        self.entries
            .iter()
            .find(|entry| entry.appointment_type.name == name)
            .ok_or_else(|| CatalogError::UnknownType(name.to_owned()))
    }
}
