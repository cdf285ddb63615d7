//! Grouping of new slots into per-pair digests and their presentable form.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::model::{Slot, SubscriptionKey};

/// Scheme every presented booking link must use.
pub const SECURE_SCHEME: &str = "https://";

const FOOTER: &str = "NJ MVC Appointment Bot";

#[derive(Debug, Clone, PartialEq, Eq)]
/// New slots of one (type, location) pair destined for one subscriber,
/// sorted by (date, time) ascending.
pub struct NotificationDigest {
    key: SubscriptionKey,
    slots: Vec<Slot>,
}

impl NotificationDigest {
    /// Build a digest, sorting the slots chronologically and dropping repeated URLs.
    #[must_use]
    pub fn new(key: SubscriptionKey, mut slots: Vec<Slot>) -> Self {
        slots.sort_by(Slot::chronological_cmp);
        slots.dedup_by(|left, right| left.url == right.url);
        Self { key, slots }
    }

    /// Pair shared by every slot in the digest.
    #[must_use]
    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Slots in chronological order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Whether the digest holds no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One bookable time in a presentable digest.
pub struct DigestEntry {
    /// Date header the entry is listed under.
    pub date: String,
    /// Time label.
    pub time: String,
    /// Booking link.
    pub url: String,
    /// Set on the chronologically first entry only.
    pub earliest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Sink-agnostic rendering of a [`NotificationDigest`].
pub struct PresentableDigest {
    /// "type @ location" title.
    pub title: String,
    /// Number of presented entries.
    pub count: usize,
    /// Entries in chronological order.
    pub entries: Vec<DigestEntry>,
    /// Footer line.
    pub footer: String,
    /// When the digest was produced.
    pub generated_at: DateTime<Utc>,
}

impl PresentableDigest {
    /// Render as Markdown with one header per date and a booking link per time.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PresentableDigest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "**{}**", self.title)?;
        writeln!(formatter, "Appointments found: {}", self.count)?;

        let mut current_date: Option<&str> = None;
        for entry in &self.entries {
            if current_date != Some(entry.date.as_str()) {
                current_date = Some(entry.date.as_str());
                writeln!(formatter, "\n__{}__", entry.date)?;
            }
            let prefix = if entry.earliest { "EARLIEST AVAILABLE " } else { "" };
            writeln!(formatter, "- {prefix}{}: [Book Slot]({})", entry.time, entry.url)?;
        }

        write!(formatter, "\n_{}_", self.footer)
    }
}

/// Turn a digest into its presentable form.
///
/// Slots whose URL does not use [`SECURE_SCHEME`] are left out of the output
/// with a warning. The first presented entry is flagged as the earliest.
#[must_use]
pub fn format_digest(
    digest: &NotificationDigest,
    generated_at: DateTime<Utc>,
) -> PresentableDigest {
    let mut entries: Vec<DigestEntry> = Vec::with_capacity(digest.slots.len());
    for slot in &digest.slots {
        if !slot.url.starts_with(SECURE_SCHEME) {
            warn!(url = %slot.url, "Invalid URL skipped");
            continue;
        }
        entries.push(DigestEntry {
            date: slot.date.clone(),
            time: slot.time.clone(),
            url: slot.url.clone(),
            earliest: entries.is_empty(),
        });
    }

    PresentableDigest {
        title: digest.key.to_string(),
        count: entries.len(),
        entries,
        footer: FOOTER.to_owned(),
        generated_at,
    }
}
