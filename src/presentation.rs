//! Per-vehicle display summaries handed to the map renderer.

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::classifier::{VehicleMode, classify};
use crate::models::VehicleRecord;

/// Marker used when a timestamp is zero or out of range.
pub const UNKNOWN_TIME: &str = "Unknown";
const NOT_AVAILABLE: &str = "N/A";
/// Deviations beyond this many seconds are reported as major.
const MAJOR_DEVIATION_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "seconds")]
pub enum ScheduleStatus {
    OnTime,
    Early(u64),
    Late(u64),
}

impl ScheduleStatus {
    /// Positive deviations are late, negative early; zero or absent is on time.
    pub fn from_deviation(deviation: Option<i64>) -> Self {
        match deviation {
            None | Some(0) => ScheduleStatus::OnTime,
            Some(d) if d > 0 => ScheduleStatus::Late(d.unsigned_abs()),
            Some(d) => ScheduleStatus::Early(d.unsigned_abs()),
        }
    }

    pub fn severity(self) -> DeviationSeverity {
        match self {
            ScheduleStatus::OnTime => DeviationSeverity::OnTime,
            ScheduleStatus::Early(s) | ScheduleStatus::Late(s) if s > MAJOR_DEVIATION_SECS => {
                DeviationSeverity::Major
            }
            _ => DeviationSeverity::Minor,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStatus::OnTime => f.write_str("On time"),
            ScheduleStatus::Early(s) => write!(f, "{s}s early"),
            ScheduleStatus::Late(s) => write!(f, "{s}s late"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviationSeverity {
    OnTime,
    Minor,
    Major,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub count: i64,
    pub capacity: i64,
    pub percent: i64,
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.count, self.capacity, self.percent)
    }
}

/// Everything the map popup and marker need for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub vehicle_id: String,
    pub short_id: String,
    pub mode: VehicleMode,
    pub title: &'static str,
    pub symbol: &'static str,
    pub color: &'static str,
    pub agency_name: String,
    pub agency_phone: Option<String>,
    pub status: String,
    pub phase: String,
    pub last_update: String,
    pub schedule: Option<ScheduleStatus>,
    pub schedule_text: Option<String>,
    pub severity: Option<DeviationSeverity>,
    pub next_stop: Option<String>,
    pub closest_stop: Option<String>,
    pub active_trip_id: Option<String>,
    pub heading: Option<i64>,
    pub occupancy: Option<Occupancy>,
    pub distance_along_trip: Option<String>,
    pub total_distance: Option<String>,
    pub alerts: Option<String>,
    pub position: Option<String>,
}

/// Formats an epoch-millisecond timestamp as wall-clock time, in `timezone`
/// when it names a known zone and UTC otherwise.
pub fn format_update_time(epoch_ms: i64, timezone: Option<&str>) -> String {
    if epoch_ms == 0 {
        return UNKNOWN_TIME.to_string();
    }
    let Some(utc) = DateTime::from_timestamp_millis(epoch_ms) else {
        return UNKNOWN_TIME.to_string();
    };
    match timezone.and_then(|tz| tz.parse::<Tz>().ok()) {
        Some(tz) => utc.with_timezone(&tz).format("%H:%M:%S").to_string(),
        None => utc.format("%H:%M:%S").to_string(),
    }
}

/// Metres below 1 km, kilometres with one decimal from 1 km upward.
pub fn format_distance(meters: Option<f64>) -> String {
    match meters {
        None => NOT_AVAILABLE.to_string(),
        Some(m) if m == 0.0 => NOT_AVAILABLE.to_string(),
        Some(m) if m < 1000.0 => format!("{}m", m.round() as i64),
        Some(m) => format!("{:.1}km", m / 1000.0),
    }
}

/// `round(count / capacity * 100)`, only for a positive capacity.
pub fn occupancy_percent(count: i64, capacity: i64) -> Option<i64> {
    if capacity <= 0 {
        return None;
    }
    Some((count as f64 / capacity as f64 * 100.0).round() as i64)
}

fn agency_name(vehicle: &VehicleRecord) -> String {
    match &vehicle.agency_info {
        Some(agency) => agency.name.clone(),
        None if !vehicle.agency_id.is_empty() => format!("Agency {}", vehicle.agency_id),
        None => "Unknown Agency".to_string(),
    }
}

pub fn summarize(vehicle: &VehicleRecord) -> VehicleSummary {
    let classification = classify(vehicle);
    let trip = vehicle.trip_status.as_ref();
    let timezone = vehicle.agency_info.as_ref().map(|a| a.timezone.as_str());

    let schedule = trip
        .and_then(|t| t.schedule_deviation)
        .map(|d| ScheduleStatus::from_deviation(Some(d)));

    let occupancy = trip.and_then(|t| {
        let count = t.occupancy_count?;
        let capacity = t.occupancy_capacity?;
        Some(Occupancy {
            count,
            capacity,
            percent: occupancy_percent(count, capacity)?,
        })
    });

    VehicleSummary {
        vehicle_id: vehicle.vehicle_id.clone(),
        short_id: vehicle
            .vehicle_id
            .rsplit('_')
            .next()
            .unwrap_or_default()
            .to_string(),
        mode: classification.mode,
        title: classification.mode.label(),
        symbol: classification.mode.symbol(),
        color: classification.color,
        agency_name: agency_name(vehicle),
        agency_phone: vehicle.agency_info.as_ref().and_then(|a| a.phone.clone()),
        status: vehicle.status.clone(),
        phase: vehicle.phase.replacen('_', " ", 1),
        last_update: format_update_time(vehicle.last_location_update_time, timezone),
        schedule,
        schedule_text: schedule.map(|s| s.to_string()),
        severity: schedule.map(ScheduleStatus::severity),
        next_stop: trip.and_then(|t| t.next_stop.clone()),
        closest_stop: trip.and_then(|t| t.closest_stop.clone()),
        active_trip_id: trip.and_then(|t| t.active_trip_id.clone()),
        heading: trip.and_then(|t| t.orientation).map(|o| o.round() as i64),
        occupancy,
        distance_along_trip: trip
            .and_then(|t| t.distance_along_trip)
            .map(|d| format_distance(Some(d))),
        total_distance: trip
            .and_then(|t| t.total_distance_along_trip)
            .map(|d| format_distance(Some(d))),
        alerts: trip
            .and_then(|t| t.situation_ids.as_ref())
            .filter(|ids| !ids.is_empty())
            .map(|ids| ids.join(", ")),
        position: vehicle
            .location
            .and_then(|l| l.coordinates())
            .map(|(lat, lon)| format!("{lat:.6}, {lon:.6}")),
    }
}
