//! Core types and service wiring for the slotwatch appointment slot notifier.

/// Static table of appointment types and their locations.
pub mod catalog;
/// Grouping and presentation of newly discovered slots.
pub mod digest;
/// Timer-driven poll cycle that fetches, filters, groups, and delivers slots.
pub mod engine;
/// Domain models and identifiers shared by all crates.
pub mod model;
/// Seen-set bookkeeping and new-slot detection.
pub mod novelty;
/// Bundle tying a site's catalog to its slot source.
pub mod plugin;
/// Traits describing the slot source and notification sink interfaces.
pub mod ports;
/// Concurrent subscriber to subscription mapping.
pub mod registry;
/// High-level service facade used by command layers.
pub mod service;

pub use catalog::*;
pub use digest::*;
pub use engine::*;
pub use model::*;
pub use novelty::*;
pub use plugin::*;
pub use ports::*;
pub use registry::*;
pub use service::*;
