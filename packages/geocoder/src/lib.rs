#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding adapter for dispatch feed locations.
//!
//! Resolves the free-text locations reported by the feed to coordinates
//! using the `MapQuest` Geocoding API. A location with no usable match
//! comes back as [`Coordinates::UNKNOWN`]. Only an unreachable provider is
//! reported as an error by [`Geocoder::geocode_all`], so the caller can
//! retry on the next poll instead of keeping a sentinel forever.
//!
//! [`address`] turns feed locations into provider queries and [`mapquest`]
//! talks to the provider.

pub mod address;
pub mod mapquest;

use std::collections::BTreeMap;

use sea_fires_feed_models::Coordinates;
use thiserror::Error;

/// Number of lookups in flight at once in [`Geocoder::geocode_all`].
const CONCURRENT_REQUESTS: usize = 4;

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// `MapQuest`-backed geocoder.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Geocoder {
    /// Creates a geocoder using `api_key` against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: mapquest::DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Points the geocoder at a different endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.base_url);
        self
    }

    /// Resolves `location`, distinguishing "no match" from failures.
    ///
    /// Placeholder locations are not sent to the provider and yield
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider request fails.
    pub async fn try_geocode(&self, location: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let Some(query) = address::to_query(location) else {
            log::debug!("Not geocoding placeholder location {location:?}");
            return Ok(None);
        };

        mapquest::geocode_single(&self.client, &self.base_url, &self.api_key, &query).await
    }

    /// Resolves `location`, falling back to [`Coordinates::UNKNOWN`] on
    /// every failure.
    pub async fn geocode(&self, location: &str) -> Coordinates {
        settle(location, self.try_geocode(location).await).unwrap_or_else(|e| {
            log::warn!("Geocoding failed for {location:?}: {e}");
            Coordinates::UNKNOWN
        })
    }

    /// Resolves several locations concurrently, keyed by the
    /// location text as given.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the provider cannot be reached for
    /// any location. Every other failure resolves to
    /// [`Coordinates::UNKNOWN`].
    pub async fn geocode_all<'a>(
        &self,
        locations: impl IntoIterator<Item = &'a str>,
    ) -> Result<BTreeMap<String, Coordinates>, GeocodeError> {
        use futures::stream::{self, StreamExt as _, TryStreamExt as _};

        stream::iter(locations.into_iter().map(|location| async move {
            let coordinates = settle(location, self.try_geocode(location).await)?;
            Ok::<_, GeocodeError>((location.to_string(), coordinates))
        }))
        .buffer_unordered(CONCURRENT_REQUESTS)
        .try_collect()
        .await
    }
}

/// Collapses a lookup result to coordinates, keeping only transport
/// failures as errors.
fn settle(
    location: &str,
    result: Result<Option<Coordinates>, GeocodeError>,
) -> Result<Coordinates, GeocodeError> {
    match result {
        Ok(Some(coordinates)) => Ok(coordinates),
        Ok(None) => {
            log::warn!("No geocoding match for {location:?}");
            Ok(Coordinates::UNKNOWN)
        }
        Err(e @ GeocodeError::Http(_)) => Err(e),
        Err(e) => {
            log::warn!("Geocoding rejected for {location:?}: {e}");
            Ok(Coordinates::UNKNOWN)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placeholder_locations_are_unknown_without_a_request() {
        // Unroutable endpoint: any request would fail rather than match.
        let geocoder = Geocoder::new("test-key")
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");

        assert_eq!(geocoder.try_geocode("UNKNOWN").await.unwrap(), None);
        assert_eq!(geocoder.geocode("   ").await, Coordinates::UNKNOWN);
    }

    #[tokio::test]
    async fn unreachable_provider_fails_the_batch() {
        let geocoder = Geocoder::new("test-key")
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");

        assert_eq!(geocoder.geocode("1100 3rd Ave").await, Coordinates::UNKNOWN);
        assert!(matches!(
            geocoder.geocode_all(["1100 3rd Ave", "UNKNOWN"]).await,
            Err(GeocodeError::Http(_))
        ));
    }

    #[tokio::test]
    async fn placeholders_alone_need_no_provider() {
        let geocoder = Geocoder::new("test-key")
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");

        let resolved = geocoder.geocode_all(["UNKNOWN", "  "]).await.unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["UNKNOWN"], Coordinates::UNKNOWN);
    }

    #[test]
    fn only_transport_failures_survive_settling() {
        let found = Coordinates::new(47.61, -122.33);
        assert_eq!(settle("a", Ok(Some(found))).unwrap(), found);
        assert_eq!(settle("a", Ok(None)).unwrap(), Coordinates::UNKNOWN);
        assert_eq!(
            settle("a", Err(GeocodeError::RateLimited)).unwrap(),
            Coordinates::UNKNOWN
        );
        assert_eq!(
            settle(
                "a",
                Err(GeocodeError::Parse {
                    message: "HTTP 400".to_string()
                })
            )
            .unwrap(),
            Coordinates::UNKNOWN
        );
    }
}
