//! Bundle of everything a booking site contributes.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::ports::SlotSource;

/// Catalog and slot source implementing one booking site.
pub struct SitePlugin {
    /// Human-friendly site name.
    pub name: String,
    /// Static type and location table for the site.
    pub catalog: Arc<Catalog>,
    /// Implementation for fetching booking pages.
    pub source: Arc<dyn SlotSource>,
}
