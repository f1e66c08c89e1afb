use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleet_feed::aggregator::FleetAggregator;
use fleet_feed::classifier::{VehicleMode, classify};
use fleet_feed::error::{FleetError, Result};
use fleet_feed::models::{
    Agency, AgencyCoverage, AggregatedFeed, EntryResponse, ListResponse, VehicleRecord,
};
use fleet_feed::poller::{FeedSource, LiveFeedPoller, TickOutcome};
use fleet_feed::presentation::summarize;
use fleet_feed::services::transit_api::TransitApi;

const DIRECTORY: &str = r#"{
    "code": 200, "currentTime": 900, "text": "OK", "version": 2,
    "data": {
        "limitExceeded": false,
        "list": [{"agencyId": "1"}, {"agencyId": "95"}],
        "references": {"agencies": [
            {"id": "1", "name": "Metro Transit", "timezone": "America/Los_Angeles", "lang": "EN", "phone": "206-553-3000"},
            {"id": "95", "name": "Washington State Ferries", "timezone": "America/Los_Angeles", "lang": "en"}
        ]}
    }
}"#;

const METRO_ROSTER: &str = r#"{
    "code": 200, "currentTime": 1000, "text": "OK", "version": 2,
    "data": {"limitExceeded": false, "list": [
        {"vehicleId": "1_LLR_42", "lastLocationUpdateTime": 1700000000000, "lastUpdateTime": 1700000000000,
         "location": {"lat": 47.61, "lon": -122.33}, "status": "SCHEDULED", "phase": "in_progress",
         "tripStatus": {"scheduleDeviation": -45, "occupancyCount": 40, "occupancyCapacity": 80}},
        {"vehicleId": "1_4361", "lastLocationUpdateTime": 0, "lastUpdateTime": 1700000000000,
         "location": {"lat": 47.62, "lon": -122.34}, "status": "SCHEDULED", "phase": "in_progress"},
        {"vehicleId": "1_7001", "lastLocationUpdateTime": 1700000000000, "lastUpdateTime": 1700000000000,
         "location": {"lat": null, "lon": -122.35}, "status": "SCHEDULED", "phase": "layover_during"}
    ]}
}"#;

/// Provider double serving canned JSON, with operator "95" failing.
struct Upstream {
    rosters: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl TransitApi for Upstream {
    async fn agencies_with_coverage(&self) -> Result<ListResponse<AgencyCoverage>> {
        Ok(serde_json::from_str(DIRECTORY)?)
    }

    async fn vehicles_for_agency(&self, agency_id: &str) -> Result<ListResponse<VehicleRecord>> {
        match self.rosters.get(agency_id) {
            Some(body) => Ok(serde_json::from_str(body)?),
            None => Err(FleetError::UpstreamUnavailable("status 503".into())),
        }
    }

    async fn agency(&self, _: &str) -> Result<EntryResponse<Agency>> {
        Err(FleetError::UpstreamUnavailable("not used".into()))
    }
}

/// Feed source replaying what the HTTP boundary would have served.
struct Served(String);

#[async_trait]
impl FeedSource for Served {
    async fn fetch(&self) -> Result<AggregatedFeed> {
        let resp: ListResponse<VehicleRecord> = serde_json::from_str(&self.0)?;
        Ok(resp.into())
    }
}

#[tokio::test]
async fn test_full_pipeline() {
    let upstream = Upstream {
        rosters: HashMap::from([("1", METRO_ROSTER)]),
    };
    let aggregator = FleetAggregator::new(Arc::new(upstream));

    let feed = aggregator.run().await.expect("directory resolves");
    assert_eq!(feed.vehicles.len(), 3);
    assert!(feed.vehicles.iter().all(|v| v.agency_id == "1"));
    assert_eq!(feed.current_time, 1000);
    assert!(!feed.limit_exceeded);

    let served = serde_json::to_string(&feed.into_response()).unwrap();
    let poller = LiveFeedPoller::new(Served(served), Duration::from_secs(15));
    assert_eq!(poller.tick().await, TickOutcome::Applied { vehicles: 1 });

    let snapshot = poller.snapshot();
    assert_eq!(snapshot.current_time, 1000);
    let vehicle = &snapshot.vehicles[0];
    assert_eq!(vehicle.vehicle_id, "1_LLR_42");

    let classification = classify(vehicle);
    assert_eq!(classification.mode, VehicleMode::LightRail);
    assert_eq!(classification.color, "#EB6209");

    let summary = summarize(vehicle);
    assert_eq!(summary.agency_name, "Metro Transit");
    assert_eq!(summary.agency_phone.as_deref(), Some("206-553-3000"));
    assert_eq!(summary.schedule_text.as_deref(), Some("45s early"));
    assert_eq!(summary.occupancy.map(|o| o.percent), Some(50));
    assert_eq!(summary.last_update, "14:13:20");
}
