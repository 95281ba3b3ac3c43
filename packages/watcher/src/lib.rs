#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Seattle Fire Real-Time 911 watcher.
//!
//! Wires the feed fetcher, the geocoder and the reconciler into a poll
//! cycle, and reports the resulting incident events through `log`.

pub mod config;

use std::time::Duration;

use sea_fires_feed::fetch::FeedClient;
use sea_fires_feed::{FeedError, Reconciler};
use sea_fires_feed_models::{IncidentEvent, RawRow};
use sea_fires_geocoder::{GeocodeError, Geocoder};

use crate::config::{ConfigError, WatcherConfig};

/// Errors that stop the watcher from starting or skip a poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The feed client could not be built or the feed could not be fetched.
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// The geocoder could not be built or its provider could not be reached.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

/// Initializes `pretty_env_logger`, defaulting to `info` when `RUST_LOG` is
/// not set.
pub fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();

    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Info);
        }
    }

    builder.try_init().ok(); // Ignore error if logger was already set (e.g., in tests)
}

/// Logs each event in its human-readable form.
pub fn present(events: &[IncidentEvent]) {
    for event in events {
        log::info!("{event}");
    }
}

/// One feed, one observer, and the incidents currently open.
#[derive(Debug)]
pub struct Watcher {
    feed: FeedClient,
    geocoder: Geocoder,
    reconciler: Reconciler,
    include_yesterday: bool,
    poll_interval: Duration,
}

impl Watcher {
    /// Builds a watcher with nothing tracked.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError`] if an HTTP client cannot be built.
    pub fn new(config: &WatcherConfig) -> Result<Self, WatcherError> {
        Ok(Self {
            feed: FeedClient::new(&config.feed_url, &config.user_agent)?,
            geocoder: Geocoder::new(&config.mapquest_api_key)?,
            reconciler: Reconciler::new(config.origin()),
            include_yesterday: config.include_yesterday,
            poll_interval: config.poll_interval(),
        })
    }

    /// Incidents tracked so far.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Fetches a snapshot, geocodes newly seen locations, and reconciles.
    ///
    /// If the feed or the geocoding provider cannot be reached nothing is
    /// reconciled and the tracked incidents are left as they were.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Feed`] if any feed window cannot be fetched
    /// and [`WatcherError::Geocode`] if the geocoding provider is
    /// unreachable.
    pub async fn run_cycle(&mut self) -> Result<Vec<IncidentEvent>, WatcherError> {
        let today = chrono::Local::now().date_naive();
        let rows = self
            .feed
            .fetch_snapshot(today, self.include_yesterday)
            .await?;

        self.apply_snapshot(&rows).await
    }

    /// Geocodes the locations of rows not yet tracked, then reconciles
    /// `rows`.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Geocode`] without touching the tracked
    /// incidents if the geocoding provider is unreachable.
    pub async fn apply_snapshot(
        &mut self,
        rows: &[RawRow],
    ) -> Result<Vec<IncidentEvent>, WatcherError> {
        let unseen = self.reconciler.unseen_addresses(rows);
        let resolved = if unseen.is_empty() {
            std::collections::BTreeMap::new()
        } else {
            log::debug!("Geocoding {} new location(s)", unseen.len());
            self.geocoder.geocode_all(unseen).await?
        };

        let events = self.reconciler.reconcile(rows, &resolved);
        log::debug!(
            "Cycle complete: {} row(s), {} event(s), {} open incident(s)",
            rows.len(),
            events.len(),
            self.reconciler.len()
        );

        Ok(events)
    }

    /// Polls until interrupted with Ctrl-C.
    ///
    /// A failed cycle is logged and skipped; the next poll starts from the
    /// same tracked state.
    pub async fn run_forever(&mut self) {
        log::info!(
            "Watching for incidents every {}s from {:.4}, {:.4}",
            self.poll_interval.as_secs(),
            self.reconciler.origin().latitude,
            self.reconciler.origin().longitude,
        );

        loop {
            match self.run_cycle().await {
                Ok(events) => present(&events),
                Err(e) => log::error!("Skipping poll cycle: {e}"),
            }

            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Interrupted, tracking {} open incident(s)", self.reconciler.len());
                    return;
                }
            }
        }
    }
}
