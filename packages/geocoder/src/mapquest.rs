//! `MapQuest` Geocoding API client.
//!
//! See <https://developer.mapquest.com/documentation/geocoding-api/address/get/>

use sea_fires_feed_models::Coordinates;
use serde::Deserialize;

use crate::GeocodeError;

/// `MapQuest` address endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

/// City a result must fall in to be accepted.
const EXPECTED_CITY: &str = "Seattle";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    results: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    #[serde(default)]
    admin_area5: Option<String>,
    lat_lng: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Geocodes a single one-line query.
///
/// # Errors
///
/// Returns [`GeocodeError::Http`] if the provider cannot be reached,
/// [`GeocodeError::RateLimited`] on HTTP 429, and [`GeocodeError::Parse`]
/// for any other rejection or an unreadable body.
pub async fn geocode_single(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    query: &str,
) -> Result<Option<Coordinates>, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[
            ("key", api_key),
            ("location", query),
            ("thumbMaps", "false"),
        ])
        .send()
        .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GeocodeError::Parse {
            message: format!("MapQuest returned HTTP {status}: {body}"),
        });
    }

    let body: serde_json::Value = resp.json().await.map_err(|e| {
        if e.is_decode() {
            GeocodeError::Parse {
                message: format!("MapQuest returned an unreadable body: {e}"),
            }
        } else {
            GeocodeError::Http(e)
        }
    })?;
    parse_response(&body)
}

/// Picks the first location inside the expected city from a `MapQuest`
/// response.
///
/// Returns `Ok(None)` when there are no results or none of them are in the
/// city.
///
/// # Errors
///
/// Returns [`GeocodeError::Parse`] if the body does not have the expected
/// shape.
pub fn parse_response(body: &serde_json::Value) -> Result<Option<Coordinates>, GeocodeError> {
    let response = Response::deserialize(body).map_err(|e| GeocodeError::Parse {
        message: format!("Unexpected MapQuest response: {e}"),
    })?;

    if response.results.is_empty() {
        log::debug!("MapQuest returned no results");
        return Ok(None);
    }

    let found = response
        .results
        .iter()
        .flat_map(|r| &r.locations)
        .find(|loc| loc.admin_area5.as_deref() == Some(EXPECTED_CITY))
        .map(|loc| Coordinates::new(loc.lat_lng.lat, loc.lat_lng.lng));

    if found.is_none() {
        log::debug!("MapQuest returned no locations in {EXPECTED_CITY}");
    }

    Ok(found)
}
