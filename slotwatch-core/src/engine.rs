//! Timer-driven poll cycle: fetch every subscribed pair, keep what is new,
//! group it per subscriber, and hand the digests to the notification sink.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt as _;
use futures::future::join_all;
use futures::stream::{self, StreamExt as _};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, debug, error, info, info_span, warn};

use crate::catalog::Catalog;
use crate::digest::{NotificationDigest, format_digest};
use crate::model::{FetchTarget, RawSlot, Slot, SubscriberId, SubscriptionKey};
use crate::novelty::{SeenSet, filter_new};
use crate::ports::{NotificationSink, PortError, SlotSource};
use crate::registry::{RegistrySnapshot, SubscriptionRegistry};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;
const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Tuning knobs for the poll loop, read once at startup.
pub struct EngineConfig {
    /// Sleep between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Upper bound on booking pages fetched at the same time.
    pub max_concurrent_fetches: usize,
    /// Upper bound on a single delivery to a single subscriber.
    pub delivery_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Phase the engine is currently in.
pub enum CycleState {
    /// Not inside a cycle.
    Idle,
    /// Fetching booking pages.
    Fetching,
    /// Filtering and grouping new slots.
    Grouping,
    /// Handing digests to the sink.
    Delivering,
    /// Waiting for the next cycle.
    Sleeping,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Counters describing one finished cycle.
pub struct CycleReport {
    /// Pairs whose page was fetched and parsed.
    pub pairs_fetched: usize,
    /// Pairs whose fetch failed.
    pub pairs_failed: usize,
    /// Pairs skipped because the catalog could not resolve them.
    pub pairs_skipped: usize,
    /// Slots not seen before this cycle.
    pub new_slots: usize,
    /// Digests the sink accepted.
    pub deliveries_ok: usize,
    /// Digests the sink rejected or did not accept in time.
    pub deliveries_failed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct DeliveryOutcome {
    delivered: usize,
    failed: usize,
}

/// Owns the seen-set and drives the fetch, filter, group, deliver loop.
pub struct PollEngine {
    catalog: Arc<Catalog>,
    registry: Arc<SubscriptionRegistry>,
    source: Arc<dyn SlotSource>,
    sink: Arc<dyn NotificationSink>,
    config: EngineConfig,
    seen: SeenSet,
    state: CycleState,
    cycles: u64,
}

impl PollEngine {
    /// Create an engine with an empty seen-set.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        registry: Arc<SubscriptionRegistry>,
        source: Arc<dyn SlotSource>,
        sink: Arc<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            registry,
            source,
            sink,
            config,
            seen: SeenSet::new(),
            state: CycleState::Idle,
            cycles: 0,
        }
    }

    /// Current phase. Reported in the log when a cycle panics.
    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// URLs surfaced so far.
    #[must_use]
    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// Cancellation abandons an in-flight cycle. A panic inside a cycle is
    /// logged and the loop carries on after the usual sleep.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            max_concurrent_fetches = self.config.max_concurrent_fetches,
            "Poll loop started"
        );

        loop {
            self.cycles += 1;
            let span = info_span!("poll_cycle", cycle = self.cycles);
            let cycle = AssertUnwindSafe(self.run_cycle().instrument(span)).catch_unwind();

            let finished = tokio::select! {
                () = shutdown.cancelled() => None,
                outcome = cycle => Some(outcome),
            };
            let Some(outcome) = finished else {
                info!("Shutdown requested during cycle");
                break;
            };

            match outcome {
                Ok(report) => info!(
                    pairs_fetched = report.pairs_fetched,
                    pairs_failed = report.pairs_failed,
                    pairs_skipped = report.pairs_skipped,
                    new_slots = report.new_slots,
                    deliveries_ok = report.deliveries_ok,
                    deliveries_failed = report.deliveries_failed,
                    subscribers = self.registry.subscriber_count(),
                    seen = self.seen.len(),
                    "Poll cycle finished"
                ),
                Err(_panic) => error!(
                    phase = ?self.state,
                    "Poll cycle panicked; continuing with next cycle"
                ),
            }

            self.state = CycleState::Sleeping;
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = sleep(self.config.interval) => {}
            }
        }

        self.state = CycleState::Idle;
        info!("Poll loop stopped");
    }

    /// Run a single fetch, filter, group, deliver pass over the current subscriptions.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            debug!("No subscriptions; nothing to poll");
            self.state = CycleState::Idle;
            return report;
        }

        self.state = CycleState::Fetching;
        let targets = self.resolve_pairs(&snapshot, &mut report);
        let fetched = self.fetch_all(targets).await;

        self.state = CycleState::Grouping;
        let new_by_pair = self.collect_new(fetched, &mut report);
        let deliveries = group_by_subscriber(&snapshot, &new_by_pair);

        self.state = CycleState::Delivering;
        let generated_at = Utc::now();
        let outcomes = join_all(
            deliveries
                .iter()
                .map(|(subscriber, digests)| self.deliver_to(*subscriber, digests, generated_at)),
        )
        .await;
        for outcome in outcomes {
            report.deliveries_ok += outcome.delivered;
            report.deliveries_failed += outcome.failed;
        }

        // Anything handed to the sink counts as surfaced, whether or not the
        // delivery went through.
        for slot in deliveries.values().flatten().flat_map(NotificationDigest::slots) {
            self.seen.mark_seen(slot.url.clone());
        }

        self.state = CycleState::Idle;
        report
    }

    fn resolve_pairs(
        &self,
        snapshot: &RegistrySnapshot,
        report: &mut CycleReport,
    ) -> Vec<(SubscriptionKey, FetchTarget)> {
        let pairs: BTreeSet<&SubscriptionKey> = snapshot.values().flatten().collect();
        let mut targets = Vec::with_capacity(pairs.len());
        for key in pairs {
            match self.catalog.resolve(key) {
                Ok(target) => targets.push((key.clone(), target)),
                Err(err) => {
                    report.pairs_skipped += 1;
                    warn!(
                        appointment_type = %key.appointment_type,
                        location = %key.location,
                        error = %err,
                        "Skipping pair missing from catalog"
                    );
                }
            }
        }
        targets
    }

    async fn fetch_all(
        &self,
        targets: Vec<(SubscriptionKey, FetchTarget)>,
    ) -> Vec<(SubscriptionKey, Result<Vec<RawSlot>, PortError>)> {
        let source = &self.source;
        stream::iter(targets)
            .map(|(key, target)| async move {
                let result = source.fetch(target).await;
                (key, result)
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await
    }

    fn collect_new(
        &self,
        fetched: Vec<(SubscriptionKey, Result<Vec<RawSlot>, PortError>)>,
        report: &mut CycleReport,
    ) -> BTreeMap<SubscriptionKey, Vec<Slot>> {
        let mut claimed = HashSet::new();
        let mut new_by_pair = BTreeMap::new();

        for (key, result) in fetched {
            let candidates = match result {
                Ok(candidates) => candidates,
                Err(err) => {
                    report.pairs_failed += 1;
                    warn!(
                        appointment_type = %key.appointment_type,
                        location = %key.location,
                        error = %err,
                        "Failed to fetch slots"
                    );
                    continue;
                }
            };
            report.pairs_fetched += 1;

            let fresh: Vec<Slot> = filter_new(candidates, &self.seen, &key)
                .into_iter()
                .filter(|slot| claimed.insert(slot.url.clone()))
                .collect();
            if fresh.is_empty() {
                continue;
            }

            debug!(
                appointment_type = %key.appointment_type,
                location = %key.location,
                count = fresh.len(),
                "New slots found"
            );
            report.new_slots += fresh.len();
            new_by_pair.insert(key, fresh);
        }

        new_by_pair
    }

    async fn deliver_to(
        &self,
        subscriber: SubscriberId,
        digests: &[NotificationDigest],
        generated_at: DateTime<Utc>,
    ) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();
        for digest in digests {
            let presented = format_digest(digest, generated_at);
            if presented.entries.is_empty() {
                debug!(%subscriber, title = %presented.title, "Nothing presentable in digest");
                continue;
            }

            match timeout(
                self.config.delivery_timeout,
                self.sink.deliver(subscriber, &presented),
            )
            .await
            {
                Ok(Ok(())) => outcome.delivered += 1,
                Ok(Err(err)) => {
                    outcome.failed += 1;
                    warn!(
                        %subscriber,
                        title = %presented.title,
                        error = %err,
                        "Cannot notify subscriber"
                    );
                }
                Err(_elapsed) => {
                    outcome.failed += 1;
                    warn!(%subscriber, title = %presented.title, "Notification timed out");
                }
            }
        }
        outcome
    }
}

/// Build, per subscriber, one digest for every subscribed pair that produced new slots.
fn group_by_subscriber(
    snapshot: &RegistrySnapshot,
    new_by_pair: &BTreeMap<SubscriptionKey, Vec<Slot>>,
) -> BTreeMap<SubscriberId, Vec<NotificationDigest>> {
    let mut deliveries = BTreeMap::new();
    if new_by_pair.is_empty() {
        return deliveries;
    }

    for (subscriber, keys) in snapshot {
        let digests: Vec<NotificationDigest> = keys
            .iter()
            .filter_map(|key| {
                new_by_pair
                    .get(key)
                    .map(|slots| NotificationDigest::new(key.clone(), slots.clone()))
            })
            .collect();
        if !digests.is_empty() {
            deliveries.insert(*subscriber, digests);
        }
    }
    deliveries
}
