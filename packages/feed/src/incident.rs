//! A single open incident and the geometry relative to the observer.

use std::collections::BTreeSet;

use chrono::{NaiveDateTime, TimeDelta};
use sea_fires_feed_models::{Coordinates, IncidentEvent, Quadrant};

use crate::FeedError;

/// `strftime` pattern of the feed's dispatch timestamps.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Parses a feed timestamp such as `12/25/2022 01:15:30 PM`.
///
/// # Errors
///
/// Returns [`FeedError::MalformedTimestamp`] if `text` does not match
/// [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, FeedError> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|source| {
        FeedError::MalformedTimestamp {
            text: text.to_string(),
            source,
        }
    })
}

/// Haversine distance between two points, in kilometers.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin() * EARTH_RADIUS_KM
}

/// An incident that is currently open in the feed.
///
/// Identity, dispatch time, address and coordinates are fixed at creation.
/// The classification follows the feed, and the set of responding units only
/// ever grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    id: String,
    opened_at: NaiveDateTime,
    address: String,
    coordinates: Coordinates,
    classification: String,
    units: BTreeSet<String>,
}

impl Incident {
    /// Creates an incident with no responding units.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MalformedTimestamp`] if `timestamp_text` is not
    /// in the feed's `MM/DD/YYYY hh:mm:ss AM|PM` format.
    pub fn create(
        id: &str,
        timestamp_text: &str,
        address: &str,
        coordinates: Coordinates,
        classification: &str,
    ) -> Result<Self, FeedError> {
        Ok(Self::new(
            id,
            parse_timestamp(timestamp_text)?,
            address,
            coordinates,
            classification,
        ))
    }

    /// Creates an incident from an already parsed dispatch time.
    #[must_use]
    pub fn new(
        id: &str,
        opened_at: NaiveDateTime,
        address: &str,
        coordinates: Coordinates,
        classification: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            opened_at,
            address: address.to_string(),
            coordinates,
            classification: classification.to_string(),
            units: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn opened_at(&self) -> NaiveDateTime {
        self.opened_at
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    #[must_use]
    pub fn classification(&self) -> &str {
        &self.classification
    }

    /// Units that have responded so far.
    #[must_use]
    pub const fn units(&self) -> &BTreeSet<String> {
        &self.units
    }

    /// Overwrites the classification.
    ///
    /// Returns a [`IncidentEvent::TypeChanged`] if the classification
    /// actually changed.
    pub fn update_type(&mut self, new_type: &str) -> Option<IncidentEvent> {
        if self.classification == new_type {
            return None;
        }

        let old_type = std::mem::replace(&mut self.classification, new_type.to_string());
        Some(IncidentEvent::TypeChanged {
            id: self.id.clone(),
            address: self.address.clone(),
            old_type,
            new_type: new_type.to_string(),
        })
    }

    /// Records a responding unit.
    ///
    /// Returns a [`IncidentEvent::UnitAssigned`] the first time a unit is
    /// seen on this incident.
    pub fn add_unit(&mut self, unit: &str) -> Option<IncidentEvent> {
        if self.units.contains(unit) {
            return None;
        }

        self.units.insert(unit.to_string());
        Some(IncidentEvent::UnitAssigned {
            id: self.id.clone(),
            unit: unit.to_string(),
            address: self.address.clone(),
        })
    }

    /// Great-circle distance to `origin` in kilometers.
    #[must_use]
    pub fn distance_to(&self, origin: Coordinates) -> f64 {
        haversine_km(origin, self.coordinates)
    }

    /// Which quadrant around `origin` this incident lies in.
    ///
    /// Equal latitude counts as south and equal longitude as west.
    #[must_use]
    pub fn bearing_quadrant_to(&self, origin: Coordinates) -> Quadrant {
        Quadrant::from_flags(
            self.coordinates.latitude > origin.latitude,
            self.coordinates.longitude > origin.longitude,
        )
    }

    /// Time between dispatch and `now`.
    #[must_use]
    pub fn elapsed_at(&self, now: NaiveDateTime) -> TimeDelta {
        now - self.opened_at
    }

    /// Time since dispatch by the local wall clock.
    ///
    /// Feed timestamps carry no zone; they are read as local time.
    #[must_use]
    pub fn elapsed_since_open(&self) -> TimeDelta {
        self.elapsed_at(chrono::Local::now().naive_local())
    }
}
