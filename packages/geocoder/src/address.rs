//! Location cleaning for dispatch feed addresses.
//!
//! The feed reports locations in a few shapes:
//! - Street addresses: `"1100 3rd Ave"`
//! - Intersections: `"3rd Ave / Pine St"`
//! - Placeholders when dispatch has no address yet: `"UNKNOWN"`
//!
//! This module turns them into a single-line query for the geocoding
//! provider, scoped to the city the feed covers.

use regex::Regex;
use std::sync::LazyLock;

/// City and state appended to every query.
pub const CITY_SUFFIX: &str = ", Seattle, WA";

/// Runs of whitespace, including non-breaking spaces from the markup.
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Intersection separator with any surrounding whitespace.
static SLASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*/\s*").expect("valid regex"));

/// Non-geocodable location placeholders.
static SKIP_PATTERNS: &[&str] = &["UNKNOWN", "N/A", "NA", "NONE", "UNDETERMINED"];

/// Result of cleaning a feed location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanedLocation {
    /// A street address.
    Street(String),
    /// Two cross streets.
    Intersection {
        /// First street.
        street1: String,
        /// Second street.
        street2: String,
    },
    /// Blank or a placeholder.
    NotGeocodable,
}

impl CleanedLocation {
    /// The provider query for this location, or `None` if it should not be
    /// sent at all.
    #[must_use]
    pub fn to_query(&self) -> Option<String> {
        match self {
            Self::Street(street) => Some(format!("{street}{CITY_SUFFIX}")),
            Self::Intersection { street1, street2 } => {
                Some(format!("{street1} & {street2}{CITY_SUFFIX}"))
            }
            Self::NotGeocodable => None,
        }
    }
}

/// Cleans a raw feed location.
#[must_use]
pub fn clean_location(raw: &str) -> CleanedLocation {
    let location = WHITESPACE_RE.replace_all(raw.trim(), " ").to_string();

    if location.is_empty()
        || SKIP_PATTERNS
            .iter()
            .any(|p| location.eq_ignore_ascii_case(p))
    {
        return CleanedLocation::NotGeocodable;
    }

    let parts: Vec<&str> = SLASH_RE.splitn(&location, 2).collect();
    if let [street1, street2] = parts.as_slice()
        && !street1.is_empty()
        && !street2.is_empty()
    {
        return CleanedLocation::Intersection {
            street1: (*street1).to_string(),
            street2: (*street2).to_string(),
        };
    }

    CleanedLocation::Street(SLASH_RE.replace_all(&location, " ").trim().to_string())
}

/// Builds the provider query for a raw feed location.
#[must_use]
pub fn to_query(raw: &str) -> Option<String> {
    clean_location(raw).to_query()
}
