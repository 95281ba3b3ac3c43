//! Snapshot reconciliation.
//!
//! Each poll produces a complete snapshot of the open incidents. The
//! [`Reconciler`] diffs it against what it is tracking:
//!
//! 1. ids it has never seen are opened, using coordinates the caller has
//!    already resolved;
//! 2. every id in the snapshot gets its units merged and classification
//!    overwritten, including ids opened in step 1;
//! 3. tracked ids missing from the snapshot are resolved and dropped.
//!
//! Geocoding happens outside of [`Reconciler::reconcile`], which never
//! blocks: call [`Reconciler::unseen_addresses`] first, resolve those
//! addresses however is convenient, and pass the results in as a
//! [`LocationResolver`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use sea_fires_feed_models::{Coordinates, IncidentEvent, RawRow};

use crate::incident::{Incident, parse_timestamp};

/// Maps an address to coordinates for incidents opened this cycle.
///
/// Unresolvable addresses map to [`Coordinates::UNKNOWN`].
pub trait LocationResolver {
    /// Coordinates for `address`.
    fn resolve(&self, address: &str) -> Coordinates;
}

impl LocationResolver for BTreeMap<String, Coordinates> {
    fn resolve(&self, address: &str) -> Coordinates {
        self.get(address).copied().unwrap_or(Coordinates::UNKNOWN)
    }
}

impl<F> LocationResolver for F
where
    F: Fn(&str) -> Coordinates,
{
    fn resolve(&self, address: &str) -> Coordinates {
        self(address)
    }
}

/// Tracks open incidents across snapshots for one feed.
#[derive(Debug, Clone)]
pub struct Reconciler {
    origin: Coordinates,
    tracked: BTreeMap<String, Incident>,
}

impl Reconciler {
    /// Creates a reconciler with nothing tracked, measuring distances from
    /// `origin`.
    #[must_use]
    pub const fn new(origin: Coordinates) -> Self {
        Self {
            origin,
            tracked: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn origin(&self) -> Coordinates {
        self.origin
    }

    /// Incidents currently open, keyed by feed id.
    #[must_use]
    pub const fn tracked(&self) -> &BTreeMap<String, Incident> {
        &self.tracked
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Incident> {
        self.tracked.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Distinct addresses of rows whose id is not tracked yet, in snapshot
    /// order. These are the only addresses [`Reconciler::reconcile`] will
    /// ask its resolver about.
    #[must_use]
    pub fn unseen_addresses<'a>(&self, rows: &'a [RawRow]) -> Vec<&'a str> {
        let mut seen = BTreeSet::new();
        rows.iter()
            .filter(|row| !self.tracked.contains_key(&row.id))
            .map(|row| row.location_text.as_str())
            .filter(|address| seen.insert(*address))
            .collect()
    }

    /// Reconciles `rows` against the tracked incidents using the local wall
    /// clock for resolution times.
    pub fn reconcile(
        &mut self,
        rows: &[RawRow],
        resolver: &impl LocationResolver,
    ) -> Vec<IncidentEvent> {
        self.reconcile_at(rows, resolver, chrono::Local::now().naive_local())
    }

    /// Reconciles `rows` against the tracked incidents, treating `now` as
    /// the current time.
    ///
    /// Rows whose timestamp cannot be parsed are left out of the cycle
    /// entirely, as if the feed had not listed them. Afterwards the tracked
    /// ids are exactly the ids of the remaining rows.
    ///
    /// Events come out grouped: openings, then unit and type changes, then
    /// resolutions.
    pub fn reconcile_at(
        &mut self,
        rows: &[RawRow],
        resolver: &impl LocationResolver,
        now: NaiveDateTime,
    ) -> Vec<IncidentEvent> {
        let rows: Vec<(&RawRow, NaiveDateTime)> = rows.iter().filter_map(dispatched_at).collect();
        let mut events = Vec::new();

        for &(row, opened_at) in &rows {
            if !self.tracked.contains_key(&row.id) {
                events.push(self.open(row, opened_at, resolver));
            }
        }

        for (row, _) in &rows {
            let Some(incident) = self.tracked.get_mut(&row.id) else {
                continue;
            };
            events.extend(row.units().filter_map(|unit| incident.add_unit(unit)));
            events.extend(incident.update_type(&row.type_text));
        }

        let active: BTreeSet<&str> = rows.iter().map(|(row, _)| row.id.as_str()).collect();
        let resolved: Vec<String> = self
            .tracked
            .keys()
            .filter(|id| !active.contains(id.as_str()))
            .cloned()
            .collect();

        for id in resolved {
            if let Some(incident) = self.tracked.remove(&id) {
                let elapsed_minutes = incident.elapsed_at(now).num_minutes();
                log::debug!("Incident {id} resolved after {elapsed_minutes} minute(s)");
                events.push(IncidentEvent::Resolved {
                    id,
                    address: incident.address().to_string(),
                    elapsed_minutes,
                });
            }
        }

        events
    }

    fn open(
        &mut self,
        row: &RawRow,
        opened_at: NaiveDateTime,
        resolver: &impl LocationResolver,
    ) -> IncidentEvent {
        let coordinates = resolver.resolve(&row.location_text);
        if coordinates.is_unknown() {
            log::warn!(
                "No coordinates for {:?} (incident {}), distances will be relative to 0,0",
                row.location_text,
                row.id
            );
        }

        let incident = Incident::new(
            &row.id,
            opened_at,
            &row.location_text,
            coordinates,
            &row.type_text,
        );

        let event = IncidentEvent::Opened {
            id: row.id.clone(),
            incident_type: incident.classification().to_string(),
            address: incident.address().to_string(),
            distance_km: incident.distance_to(self.origin),
            quadrant: incident.bearing_quadrant_to(self.origin),
        };
        self.tracked.insert(row.id.clone(), incident);
        event
    }
}

/// Pairs `row` with its parsed dispatch time, or drops it for this cycle.
fn dispatched_at(row: &RawRow) -> Option<(&RawRow, NaiveDateTime)> {
    match parse_timestamp(&row.timestamp_text) {
        Ok(opened_at) => Some((row, opened_at)),
        Err(e) => {
            log::warn!("Ignoring row {} this cycle: {e}", row.id);
            None
        }
    }
}
