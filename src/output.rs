//! Log and JSON rendering for feeds, snapshots and the agency directory.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{Agency, VehicleRecord};
use crate::poller::Snapshot;
use crate::presentation::summarize;

/// Serializes `value` as JSON, optionally pretty-printed.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Number of vehicles per display mode label.
pub fn mode_counts(vehicles: &[VehicleRecord]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for vehicle in vehicles {
        *counts.entry(summarize(vehicle).title).or_insert(0) += 1;
    }
    counts
}

/// Logs one poller snapshot: a summary line, then one line per vehicle at
/// debug level.
pub fn log_snapshot(snapshot: &Snapshot) {
    if let Some(error) = &snapshot.error {
        warn!(
            sequence = snapshot.sequence,
            error = %error,
            vehicles = snapshot.vehicles.len(),
            "Feed refresh failed, showing previous snapshot"
        );
        return;
    }

    let last_update = crate::presentation::format_update_time(snapshot.current_time, None);
    info!(
        sequence = snapshot.sequence,
        last_update = %last_update,
        vehicles = snapshot.vehicles.len(),
        modes = ?mode_counts(&snapshot.vehicles),
        "Active vehicles"
    );

    for vehicle in &snapshot.vehicles {
        let s = summarize(vehicle);
        debug!(
            vehicle = %s.short_id,
            kind = s.title,
            agency = %s.agency_name,
            color = s.color,
            updated = %s.last_update,
            schedule = s.schedule_text.as_deref().unwrap_or("-"),
            position = s.position.as_deref().unwrap_or("-"),
            "Vehicle"
        );
    }
}

pub fn log_agencies(agencies: &[Agency]) {
    for agency in agencies {
        info!(
            agency_id = %agency.id,
            name = %agency.name,
            timezone = %agency.timezone,
            phone = agency.phone.as_deref().unwrap_or("-"),
            url = agency.url.as_deref().unwrap_or("-"),
            "Agency"
        );
    }
    info!(total = agencies.len(), "Agency list fetched");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::testing::vehicle;

    #[test]
    fn test_mode_counts() {
        let mut ferry = vehicle("95_1");
        ferry.agency_id = "95".into();
        let vehicles = vec![vehicle("40_LLR_1"), vehicle("40_LLR_2"), ferry, vehicle("1_1")];
        let counts = mode_counts(&vehicles);
        assert_eq!(counts["Light Rail"], 2);
        assert_eq!(counts["Ferry"], 1);
        assert_eq!(counts["Unknown Vehicle"], 1);
    }

    #[test]
    fn test_log_snapshot_does_not_panic() {
        let snapshot = Snapshot {
            sequence: 1,
            current_time: 1_700_000_000_000,
            vehicles: vec![vehicle("1_1")],
            error: None,
        };
        log_snapshot(&snapshot);
        log_snapshot(&Snapshot {
            error: Some("boom".into()),
            ..snapshot
        });
    }

    #[test]
    fn test_to_json() {
        let compact = to_json(&serde_json::json!({"a": 1}), false).unwrap();
        assert_eq!(compact, r#"{"a":1}"#);
        assert!(to_json(&serde_json::json!({"a": 1}), true).unwrap().contains('\n'));
    }
}
