//! Client-side refresh loop over the aggregation endpoint.
//!
//! The poller pulls the whole feed on a fixed cadence and replaces its
//! snapshot wholesale. Each tick runs as its own task, so a slow response
//! may overlap the next tick; results carry the sequence number assigned
//! when the tick was issued and anything older than the applied snapshot is
//! dropped. Stopping bumps a generation counter so responses from ticks
//! issued before the stop are dropped as well.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{FleetError, Result};
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::models::{AggregatedFeed, CODE_OK, ListResponse, VehicleRecord};

/// Default refresh cadence; 10 seconds is equally valid.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// Shortest accepted cadence; shorter intervals are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Where the poller gets its feed from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<AggregatedFeed>;
}

/// [`FeedSource`] reading the aggregation endpoint over HTTP.
pub struct HttpFeedSource<C = BasicClient> {
    client: C,
    endpoint: String,
}

impl<C: HttpClient> HttpFeedSource<C> {
    pub fn new(client: C, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for HttpFeedSource<C> {
    async fn fetch(&self) -> Result<AggregatedFeed> {
        let resp: ListResponse<VehicleRecord> = fetch_json(&self.client, &self.endpoint).await?;
        if resp.code != CODE_OK {
            return Err(FleetError::UpstreamUnavailable(format!(
                "feed code {}",
                resp.code
            )));
        }
        Ok(resp.into())
    }
}

/// A record is kept only with both coordinates and a positive location time.
pub fn is_renderable(vehicle: &VehicleRecord) -> bool {
    vehicle.last_location_update_time > 0
        && vehicle
            .location
            .is_some_and(|l| l.coordinates().is_some())
}

/// Latest published view of the fleet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Sequence of the tick that produced this state; 0 before any tick.
    pub sequence: u64,
    pub current_time: i64,
    pub vehicles: Vec<VehicleRecord>,
    /// Transient error from the latest tick; cleared by the next success.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// Identifies one issued tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub sequence: u64,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Applied { vehicles: usize },
    Failed,
    Discarded,
}

pub struct LiveFeedPoller<S> {
    source: S,
    interval: Duration,
    snapshot: watch::Sender<Snapshot>,
    issued: AtomicU64,
    generation: AtomicU64,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: FeedSource + 'static> LiveFeedPoller<S> {
    pub fn new(source: S, interval: Duration) -> Arc<Self> {
        if interval < MIN_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval too short, using {}s",
                MIN_INTERVAL.as_secs()
            );
        }
        let interval = interval.max(MIN_INTERVAL);
        let (snapshot, _) = watch::channel(Snapshot::default());
        Arc::new(Self {
            source,
            interval,
            snapshot,
            issued: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            ticker: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollerState {
        let ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.as_ref().is_some_and(|h| !h.is_finished()) {
            PollerState::Polling
        } else {
            PollerState::Idle
        }
    }

    /// Idle → Polling. Issues the first tick immediately, then one every
    /// interval. Returns `false` if already polling.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let weak = Arc::downgrade(self);
        let period = self.interval;
        // Read under the ticker lock; `stop` bumps it under the same lock.
        let generation = self.generation.load(Ordering::SeqCst);
        *ticker = Some(tokio::spawn(run_ticker(weak, period, generation)));
        info!(interval_secs = period.as_secs_f64(), "Live feed polling started");
        true
    }

    /// Polling → Idle. Cancels the timer; in-flight ticks finish but their
    /// results are discarded. Returns `false` if already idle.
    pub fn stop(&self) -> bool {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = ticker.take() else {
            return false;
        };
        handle.abort();
        // Bumped under the snapshot lock so no apply can straddle the stop.
        self.snapshot.send_if_modified(|_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            false
        });
        drop(ticker);
        info!("Live feed polling stopped");
        true
    }

    /// Reserves the next sequence number for a tick.
    pub fn issue(&self) -> Ticket {
        self.issue_in(self.generation.load(Ordering::SeqCst))
    }

    /// Ticket bound to the generation a ticker was started in, so a tick the
    /// ticker issues after a concurrent stop is still discarded.
    fn issue_in(&self, generation: u64) -> Ticket {
        Ticket {
            sequence: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
            generation,
        }
    }

    /// Runs one tick to completion: fetch, then apply.
    pub async fn tick(&self) -> TickOutcome {
        let ticket = self.issue();
        let result = self.source.fetch().await;
        self.apply(ticket, result)
    }

    /// Publishes the result of `ticket` unless a newer tick already landed or
    /// the poller was stopped since it was issued.
    pub fn apply(&self, ticket: Ticket, result: Result<AggregatedFeed>) -> TickOutcome {
        let mut outcome = TickOutcome::Discarded;

        self.snapshot.send_if_modified(|snap| {
            if ticket.generation != self.generation.load(Ordering::SeqCst) {
                debug!(sequence = ticket.sequence, "Response arrived after stop, discarding");
                return false;
            }
            if ticket.sequence <= snap.sequence {
                debug!(
                    sequence = ticket.sequence,
                    applied = snap.sequence,
                    "Stale response, discarding"
                );
                return false;
            }

            match result {
                Ok(feed) => {
                    let received = feed.vehicles.len();
                    let vehicles: Vec<_> = feed.vehicles.into_iter().filter(is_renderable).collect();
                    info!(
                        sequence = ticket.sequence,
                        received,
                        rendered = vehicles.len(),
                        "Snapshot replaced"
                    );
                    outcome = TickOutcome::Applied {
                        vehicles: vehicles.len(),
                    };
                    *snap = Snapshot {
                        sequence: ticket.sequence,
                        current_time: feed.current_time,
                        vehicles,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(sequence = ticket.sequence, error = %e, "Poll failed, keeping previous snapshot");
                    outcome = TickOutcome::Failed;
                    snap.sequence = ticket.sequence;
                    snap.error = Some(e.to_string());
                }
            }
            true
        });

        outcome
    }
}

async fn run_ticker<S: FeedSource + 'static>(
    poller: Weak<LiveFeedPoller<S>>,
    period: Duration,
    generation: u64,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(poller) = poller.upgrade() else {
            break;
        };
        let ticket = poller.issue_in(generation);
        debug!(sequence = ticket.sequence, "Tick");
        tokio::spawn(async move {
            let result = poller.source.fetch().await;
            poller.apply(ticket, result);
        });
    }
}
