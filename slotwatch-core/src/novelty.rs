//! Detection of slots that have not been surfaced yet.

use std::collections::HashSet;

use crate::model::{RawSlot, Slot, SubscriptionKey};

#[derive(Debug, Clone, Default)]
/// URLs of every slot already handed to the notification sink.
///
/// Grows for the lifetime of the process; nothing is ever evicted.
pub struct SeenSet {
    urls: HashSet<String>,
}

impl SeenSet {
    /// Create an empty seen-set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the URL has already been surfaced.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Record a URL as surfaced. Returns `false` if it was already present.
    pub fn mark_seen<S: Into<String>>(&mut self, url: S) -> bool {
        self.urls.insert(url.into())
    }

    /// Number of recorded URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Keep only candidates whose URL is not in `seen`, tied to the pair they were fetched for.
///
/// Duplicate URLs within the batch collapse to the first occurrence. `seen` is
/// left untouched; the caller marks slots once they have been handed off.
#[must_use]
pub fn filter_new(candidates: Vec<RawSlot>, seen: &SeenSet, key: &SubscriptionKey) -> Vec<Slot> {
    let mut batch = HashSet::new();
    candidates
        .into_iter()
        .filter(|raw| !seen.contains(&raw.url) && batch.insert(raw.url.clone()))
        .map(|raw| Slot::from_raw(raw, key))
        .collect()
}
