//! Wire and domain types for agencies, vehicles and the aggregated feed.
//!
//! Upstream payloads and the aggregated feed share one envelope shape
//! (`code`, `currentTime`, `data`, `text`, `version`), so the same
//! [`ListResponse`] type describes both.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope status code for a successful response.
pub const CODE_OK: i64 = 200;

/// Descriptive metadata for one transit operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agency {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fare_url: Option<String>,
    #[serde(default)]
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
    #[serde(default)]
    pub lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_service: Option<bool>,
}

/// Coverage entry from the directory: an operator id to fan out over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyCoverage {
    pub agency_id: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub lat_span: f64,
    #[serde(default)]
    pub lon_span: f64,
}

/// Coordinates as reported upstream; either side may be `null`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
        }
    }

    /// Both coordinates, when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_trip_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_stop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closest_stop: Option<String>,
    /// Degrees, 0 to 360.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<f64>,
    /// Signed seconds; positive is late.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_deviation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_along_trip: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distance_along_trip: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy_capacity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub situation_ids: Option<Vec<String>>,
    /// Fields this crate does not interpret, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One vehicle as reported by an operator roster.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    pub vehicle_id: String,
    #[serde(default)]
    pub agency_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_info: Option<Agency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub last_location_update_time: i64,
    #[serde(default)]
    pub last_update_time: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_status: Option<TripStatus>,
    /// Fields this crate does not interpret, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct References {
    #[serde(default)]
    pub agencies: Vec<Agency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListData<T> {
    #[serde(default)]
    pub limit_exceeded: bool,
    pub list: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<References>,
}

/// Envelope around a list payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub current_time: i64,
    pub data: ListData<T>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryData<T> {
    pub entry: T,
}

/// Envelope around a single-entity payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub current_time: i64,
    pub data: Option<EntryData<T>>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub version: i64,
}

/// One aggregation cycle's merged view of every operator's fleet.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedFeed {
    pub code: i64,
    pub current_time: i64,
    pub vehicles: Vec<VehicleRecord>,
    pub limit_exceeded: bool,
}

impl AggregatedFeed {
    /// Wraps the feed in the envelope served by the aggregation endpoint.
    pub fn into_response(self) -> ListResponse<VehicleRecord> {
        ListResponse {
            code: self.code,
            current_time: self.current_time,
            data: ListData {
                limit_exceeded: self.limit_exceeded,
                list: self.vehicles,
                references: None,
            },
            text: "OK".to_string(),
            version: 2,
        }
    }
}

impl From<ListResponse<VehicleRecord>> for AggregatedFeed {
    fn from(resp: ListResponse<VehicleRecord>) -> Self {
        Self {
            code: resp.code,
            current_time: resp.current_time,
            vehicles: resp.data.list,
            limit_exceeded: resp.data.limit_exceeded,
        }
    }
}
