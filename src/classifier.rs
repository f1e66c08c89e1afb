//! Vehicle mode and marker colour derivation.

use std::fmt;

use serde::Serialize;

use crate::models::VehicleRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VehicleMode {
    LightRail,
    Ferry,
    Monorail,
    Train,
    Bus,
    Unknown,
}

impl VehicleMode {
    /// Human-readable label shown in vehicle details.
    pub fn label(self) -> &'static str {
        match self {
            VehicleMode::LightRail => "Light Rail",
            VehicleMode::Ferry => "Ferry",
            VehicleMode::Monorail => "Monorail",
            VehicleMode::Train => "Train",
            VehicleMode::Bus => "Bus",
            VehicleMode::Unknown => "Unknown Vehicle",
        }
    }

    /// One-letter marker symbol; empty for unknown vehicles.
    pub fn symbol(self) -> &'static str {
        match self {
            VehicleMode::LightRail => "L",
            VehicleMode::Ferry => "F",
            VehicleMode::Monorail => "M",
            VehicleMode::Train => "T",
            VehicleMode::Bus => "B",
            VehicleMode::Unknown => "",
        }
    }
}

impl fmt::Display for VehicleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub mode: VehicleMode,
    pub color: &'static str,
}

/// Colour for operators not listed in [`AGENCY_COLORS`].
pub const DEFAULT_COLOR: &str = "#6B7280";

/// Marker colour per operator id. New operators are appended.
pub static AGENCY_COLORS: &[(&str, &str)] = &[
    ("40", "#002E6D"), // Sound Transit
    ("1", "#EB6209"),  // King County Metro
    ("3", "#036CB6"),  // Pierce Transit
    ("29", "#3357A7"), // Community Transit
    ("23", "#F37320"), // Kitsap Transit
    ("19", "#A81E21"), // Everett Transit
    ("95", "#0C7960"), // Washington State Ferries
    ("51", "#002E6D"), // Sound Transit Express
    ("96", "#298240"), // Link Light Rail
    ("97", "#F18A20"), // Tacoma Link
    ("20", "#961A2F"), // RapidRide
    ("33", "#9BB6D4"), // Sounder
];

struct Rule {
    matches: fn(&VehicleRecord) -> bool,
    mode: VehicleMode,
}

fn is_light_rail(v: &VehicleRecord) -> bool {
    v.vehicle_id.contains("LLR")
}

fn is_ferry(v: &VehicleRecord) -> bool {
    v.agency_id == "95"
}

fn is_monorail(v: &VehicleRecord) -> bool {
    v.agency_id == "96"
}

fn is_train(v: &VehicleRecord) -> bool {
    v.agency_id == "51"
}

fn is_bus(v: &VehicleRecord) -> bool {
    v.vehicle_id.contains("KPOB")
}

/// Evaluated in order; the first match wins. Append, never insert.
static RULES: &[Rule] = &[
    Rule {
        matches: is_light_rail,
        mode: VehicleMode::LightRail,
    },
    Rule {
        matches: is_ferry,
        mode: VehicleMode::Ferry,
    },
    Rule {
        matches: is_monorail,
        mode: VehicleMode::Monorail,
    },
    Rule {
        matches: is_train,
        mode: VehicleMode::Train,
    },
    Rule {
        matches: is_bus,
        mode: VehicleMode::Bus,
    },
];

pub fn agency_color(agency_id: &str) -> &'static str {
    AGENCY_COLORS
        .iter()
        .find(|(id, _)| *id == agency_id)
        .map_or(DEFAULT_COLOR, |&(_, color)| color)
}

pub fn vehicle_mode(vehicle: &VehicleRecord) -> VehicleMode {
    RULES
        .iter()
        .find(|rule| (rule.matches)(vehicle))
        .map_or(VehicleMode::Unknown, |rule| rule.mode)
}

/// Maps a vehicle to its display mode and its operator's colour.
pub fn classify(vehicle: &VehicleRecord) -> Classification {
    Classification {
        mode: vehicle_mode(vehicle),
        color: agency_color(&vehicle.agency_id),
    }
}
