#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data types shared between the dispatch feed parser, the reconciliation
//! engine, and whatever presents its output.
//!
//! [`RawRow`] is the untyped output of one parse pass. [`IncidentEvent`] is
//! the structured lifecycle output of one reconciliation cycle; its
//! [`Display`](std::fmt::Display) implementation is the human-readable form
//! the watcher logs.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Sentinel returned by the geocoder when an address cannot be
    /// resolved. It is valid input everywhere, not an error signal.
    pub const UNKNOWN: Self = Self::new(0.0, 0.0);

    /// Creates a coordinate pair from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if this is the [`Coordinates::UNKNOWN`] sentinel.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_unknown(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// Which of the two column layouts a dispatch row was captured with.
///
/// Some feed variants omit the alarm level column entirely. The layout is
/// decided once, when the row is assembled, from the number of captured
/// cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "camelCase")]
pub enum RowSchema {
    /// Five cells: time, id, units, location, type.
    Compact,
    /// Six cells: time, id, level, units, location, type.
    Leveled {
        /// Alarm level reported by the feed.
        level: u32,
    },
}

/// One active dispatch row as captured from the feed markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    /// Feed-assigned incident number, unique within a snapshot.
    pub id: String,
    /// Dispatch time, `MM/DD/YYYY hh:mm:ss AM|PM`.
    pub timestamp_text: String,
    /// Whitespace-separated responding unit identifiers.
    pub units_text: String,
    /// Free-text location.
    pub location_text: String,
    /// Incident classification.
    pub type_text: String,
    /// Column layout the row was captured with.
    pub schema: RowSchema,
}

impl RawRow {
    /// Alarm level, `0` for rows captured without a level column.
    #[must_use]
    pub const fn level(&self) -> u32 {
        match self.schema {
            RowSchema::Compact => 0,
            RowSchema::Leveled { level } => level,
        }
    }

    /// Iterates the individual unit tokens in [`RawRow::units_text`].
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.units_text.split_whitespace()
    }
}

/// Coarse direction of an incident as seen from the observer.
///
/// Variants are declared in table order: bit 1 is "east", bit 0 is
/// "north".
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Quadrant {
    /// `0b00`
    SouthWest,
    /// `0b01`
    NorthWest,
    /// `0b10`
    SouthEast,
    /// `0b11`
    NorthEast,
}

impl Quadrant {
    /// All quadrants, indexed by `east << 1 | north`.
    pub const ALL: [Self; 4] = [
        Self::SouthWest,
        Self::NorthWest,
        Self::SouthEast,
        Self::NorthEast,
    ];

    /// Picks the quadrant for the given north/east flags.
    #[must_use]
    pub const fn from_flags(is_north: bool, is_east: bool) -> Self {
        let east = if is_east { 0b10 } else { 0 };
        let north = if is_north { 0b01 } else { 0 };
        Self::ALL[east | north]
    }
}

/// A lifecycle event produced by one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentEvent {
    /// An id was seen for the first time.
    #[serde(rename_all = "camelCase")]
    Opened {
        /// Feed incident id.
        id: String,
        /// Classification at the time of opening.
        incident_type: String,
        /// Location text from the feed.
        address: String,
        /// Great-circle distance from the observer.
        distance_km: f64,
        /// Direction from the observer.
        quadrant: Quadrant,
    },
    /// The feed reclassified an open incident.
    #[serde(rename_all = "camelCase")]
    TypeChanged {
        /// Feed incident id.
        id: String,
        /// Location text of the incident.
        address: String,
        /// Previous classification.
        old_type: String,
        /// New classification.
        new_type: String,
    },
    /// A unit not previously seen on this incident is responding.
    #[serde(rename_all = "camelCase")]
    UnitAssigned {
        /// Feed incident id.
        id: String,
        /// Unit identifier, e.g. `E17`.
        unit: String,
        /// Location text of the incident.
        address: String,
    },
    /// The incident disappeared from the feed.
    #[serde(rename_all = "camelCase")]
    Resolved {
        /// Feed incident id.
        id: String,
        /// Location text of the incident.
        address: String,
        /// Whole minutes between dispatch and resolution.
        elapsed_minutes: i64,
    },
}

impl IncidentEvent {
    /// The feed id this event refers to.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Opened { id, .. }
            | Self::TypeChanged { id, .. }
            | Self::UnitAssigned { id, .. }
            | Self::Resolved { id, .. } => id,
        }
    }
}

impl fmt::Display for IncidentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened {
                incident_type,
                address,
                distance_km,
                quadrant,
                ..
            } => write!(
                f,
                "Incident of type {incident_type} is opened at {address}, \
                 {distance_km:.2} km {quadrant}."
            ),
            Self::TypeChanged {
                address,
                old_type,
                new_type,
                ..
            } => write!(
                f,
                "Incident at {address} has changed from {old_type} to {new_type}."
            ),
            Self::UnitAssigned { unit, address, .. } => {
                write!(f, "Vehicle {unit} is responding to incident at {address}.")
            }
            Self::Resolved {
                address,
                elapsed_minutes,
                ..
            } => write!(
                f,
                "Incident at {address} is now resolved after {elapsed_minutes} minutes."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(units: &str, schema: RowSchema) -> RawRow {
        RawRow {
            id: "F220001234".to_string(),
            timestamp_text: "12/25/2022 01:15:30 PM".to_string(),
            units_text: units.to_string(),
            location_text: "3rd Ave / Pine St".to_string(),
            type_text: "Aid Response".to_string(),
            schema,
        }
    }

    #[test]
    fn quadrant_table_order() {
        assert_eq!(Quadrant::from_flags(false, false), Quadrant::SouthWest);
        assert_eq!(Quadrant::from_flags(true, false), Quadrant::NorthWest);
        assert_eq!(Quadrant::from_flags(false, true), Quadrant::SouthEast);
        assert_eq!(Quadrant::from_flags(true, true), Quadrant::NorthEast);
    }

    #[test]
    fn quadrant_displays_lowercase() {
        assert_eq!(Quadrant::NorthEast.to_string(), "northeast");
        assert_eq!(Quadrant::SouthWest.as_ref(), "southwest");
        assert_eq!("northwest".parse::<Quadrant>().unwrap(), Quadrant::NorthWest);
    }

    #[test]
    fn compact_rows_have_level_zero() {
        assert_eq!(row("E1", RowSchema::Compact).level(), 0);
        assert_eq!(row("E1", RowSchema::Leveled { level: 2 }).level(), 2);
    }

    #[test]
    fn units_split_on_any_whitespace() {
        let r = row("  E1  M32\tL9 ", RowSchema::Compact);
        assert_eq!(r.units().collect::<Vec<_>>(), vec!["E1", "M32", "L9"]);
        assert_eq!(row("", RowSchema::Compact).units().count(), 0);
    }

    #[test]
    fn unknown_sentinel() {
        assert!(Coordinates::UNKNOWN.is_unknown());
        assert!(!Coordinates::new(47.6, -122.3).is_unknown());
        assert_eq!(Coordinates::from((1.5, 2.5)), Coordinates::new(1.5, 2.5));
    }

    #[test]
    fn events_render_legacy_phrasing() {
        let opened = IncidentEvent::Opened {
            id: "A".to_string(),
            incident_type: "Aid Response".to_string(),
            address: "3rd Ave / Pine St".to_string(),
            distance_km: 1.23456,
            quadrant: Quadrant::NorthEast,
        };
        assert_eq!(
            opened.to_string(),
            "Incident of type Aid Response is opened at 3rd Ave / Pine St, 1.23 km northeast."
        );

        let resolved = IncidentEvent::Resolved {
            id: "A".to_string(),
            address: "3rd Ave / Pine St".to_string(),
            elapsed_minutes: 42,
        };
        assert_eq!(
            resolved.to_string(),
            "Incident at 3rd Ave / Pine St is now resolved after 42 minutes."
        );
        assert_eq!(resolved.id(), "A");
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = IncidentEvent::UnitAssigned {
            id: "A".to_string(),
            unit: "E17".to_string(),
            address: "Pike St".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "UNIT_ASSIGNED");
        assert_eq!(json["unit"], "E17");
    }
}
