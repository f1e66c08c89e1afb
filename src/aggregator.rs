//! Fan-out over every operator roster and fan-in into one feed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{Instrument, debug, error, info, warn};

use crate::directory::{AgencyDirectory, Directory};
use crate::error::{FleetError, Result};
use crate::models::{AggregatedFeed, CODE_OK, ListResponse, VehicleRecord};
use crate::services::transit_api::TransitApi;

/// Diagnostic for one operator whose roster could not be fetched.
#[derive(Debug)]
pub struct OperatorFailure {
    pub agency_id: String,
    pub error: FleetError,
}

/// Result of one fan-out: the merged feed plus per-operator diagnostics.
#[derive(Debug)]
pub struct Aggregation {
    pub feed: AggregatedFeed,
    pub failures: Vec<OperatorFailure>,
}

pub struct FleetAggregator {
    api: Arc<dyn TransitApi>,
    directory: AgencyDirectory,
}

impl FleetAggregator {
    pub fn new(api: Arc<dyn TransitApi>) -> Self {
        Self {
            directory: AgencyDirectory::new(api.clone()),
            api,
        }
    }

    pub fn directory(&self) -> &AgencyDirectory {
        &self.directory
    }

    /// Resolves the directory, then aggregates over it.
    ///
    /// Only the directory step can fail the whole call; it is reported as
    /// `AggregateFailure` wrapping the directory error.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<AggregatedFeed> {
        let directory = self.directory.resolve().await.map_err(|e| {
            error!(error = %e, "Agency directory unavailable, nothing to fan out over");
            FleetError::aggregate(e)
        })?;
        Ok(self.aggregate(&directory).await)
    }

    /// Merged feed for every operator in `directory`. Operator failures are
    /// logged and contribute no vehicles.
    pub async fn aggregate(&self, directory: &Directory) -> AggregatedFeed {
        self.collect(directory).await.feed
    }

    /// Issues one roster request per operator concurrently and waits for all
    /// of them before merging.
    pub async fn collect(&self, directory: &Directory) -> Aggregation {
        let handles: Vec<_> = directory
            .agency_ids()
            .map(|agency_id| {
                let api = self.api.clone();
                let agency_id = agency_id.to_string();
                let span = tracing::info_span!("fetch_roster", agency_id = %agency_id);
                tokio::spawn(async move { api.vehicles_for_agency(&agency_id).await }.instrument(span))
            })
            .collect();

        let settled = join_all(handles).await;

        let slots = directory
            .agency_ids()
            .zip(settled)
            .map(|(agency_id, joined)| {
                let result = joined.unwrap_or_else(|e| {
                    Err(FleetError::UpstreamUnavailable(format!(
                        "roster task aborted: {e}"
                    )))
                });
                (agency_id, result)
            });

        merge(directory, slots)
    }
}

/// Folds settled per-operator results, in directory order, into one feed.
fn merge<'a, I>(directory: &Directory, slots: I) -> Aggregation
where
    I: IntoIterator<Item = (&'a str, Result<ListResponse<VehicleRecord>>)>,
{
    let mut vehicles = Vec::new();
    let mut seen = HashSet::new();
    let mut failures = Vec::new();
    let mut latest: Option<i64> = None;
    let mut truncated = Vec::new();

    for (agency_id, result) in slots {
        let resp = match result {
            Ok(resp) => resp,
            Err(error) => {
                warn!(agency_id, error = %error, "Roster unavailable, contributing no vehicles");
                failures.push(OperatorFailure {
                    agency_id: agency_id.to_string(),
                    error,
                });
                continue;
            }
        };

        if resp.current_time > 0 {
            latest = Some(latest.map_or(resp.current_time, |t| t.max(resp.current_time)));
        }
        if resp.data.limit_exceeded {
            truncated.push(agency_id);
        }

        let agency_info = directory.lookup(agency_id);
        let count = resp.data.list.len();
        for mut vehicle in resp.data.list {
            if !seen.insert(vehicle.vehicle_id.clone()) {
                debug!(agency_id, vehicle_id = %vehicle.vehicle_id, "Duplicate vehicle id dropped");
                continue;
            }
            vehicle.agency_id = agency_id.to_string();
            vehicle.agency_info = agency_info.cloned();
            vehicles.push(vehicle);
        }
        debug!(agency_id, vehicles = count, "Roster merged");
    }

    if !truncated.is_empty() {
        // The aggregate flag stays false; see DESIGN.md.
        debug!(operators = ?truncated, "Operators reported truncated rosters");
    }

    let current_time = latest.unwrap_or_else(|| Utc::now().timestamp_millis());

    info!(
        operators = directory.len(),
        failed = failures.len(),
        vehicles = vehicles.len(),
        current_time,
        "Aggregation complete"
    );

    Aggregation {
        feed: AggregatedFeed {
            code: CODE_OK,
            current_time,
            vehicles,
            limit_exceeded: false,
        },
        failures,
    }
}
