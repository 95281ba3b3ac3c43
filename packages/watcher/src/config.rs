//! Watcher configuration.
//!
//! Loaded from a TOML file (see `config.example.toml`). The `MapQuest` key
//! can also come from the [`API_KEY_ENV`] environment variable, which
//! takes precedence over the file.

use std::path::Path;
use std::time::Duration;

use sea_fires_feed::fetch::DEFAULT_FEED_URL;
use sea_fires_feed_models::Coordinates;
use serde::{Deserialize, Serialize};

/// `User-Agent` sent to the feed unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str =
    "SFD Feed Watcher (https://github.com/xyx0826/sea_fires_around_me)";

/// Environment variable overriding `mapquest_api_key`.
pub const API_KEY_ENV: &str = "MAPQUEST_API_KEY";

/// Errors from loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Could not read config file {path}: {source}. Copy config.example.toml to {path} and fill in your origin and API key.")]
    Io {
        /// Path that was read.
        path: String,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// The file is not valid TOML or is missing required keys.
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// Settings for one watcher process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Observer latitude in degrees.
    pub origin_lat: f64,
    /// Observer longitude in degrees.
    pub origin_lon: f64,
    /// `MapQuest` Geocoding API key.
    #[serde(default)]
    pub mapquest_api_key: String,
    /// Seconds between polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Dispatch feed endpoint.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// `User-Agent` sent to the feed.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Whether to merge yesterday's page into each snapshot.
    #[serde(default = "default_true")]
    pub include_yesterday: bool,
}

const fn default_poll_interval_secs() -> u64 {
    20
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

const fn default_true() -> bool {
    true
}

impl WatcherConfig {
    /// Reads `path`, applies the [`API_KEY_ENV`] override, and validates
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// value is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::parse(&contents)?.with_api_key(std::env::var(API_KEY_ENV).ok());
        config.validate()?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses a TOML document without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Replaces the API key when `key` is a non-blank value.
    #[must_use]
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.mapquest_api_key = key;
        }
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.origin_lat) {
            return Err(invalid(format!(
                "origin_lat {} is outside [-90, 90]",
                self.origin_lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.origin_lon) {
            return Err(invalid(format!(
                "origin_lon {} is outside [-180, 180]",
                self.origin_lon
            )));
        }
        if self.mapquest_api_key.trim().is_empty() {
            return Err(invalid(format!(
                "mapquest_api_key is empty; set it in the config file or via {API_KEY_ENV}"
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs must be at least 1".to_string()));
        }
        if self.feed_url.trim().is_empty() {
            return Err(invalid("feed_url is empty".to_string()));
        }
        Ok(())
    }

    /// Observer location.
    #[must_use]
    pub const fn origin(&self) -> Coordinates {
        Coordinates::new(self.origin_lat, self.origin_lon)
    }

    /// Delay between polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = include_str!("../config.example.toml");

    #[test]
    fn example_config_is_valid() {
        let config = WatcherConfig::parse(EXAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(20));
        assert!(config.include_yesterday);
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.origin(), Coordinates::new(47.6062, -122.3321));
    }

    #[test]
    fn defaults_apply() {
        let config = WatcherConfig::parse(
            "origin_lat = 47.6\norigin_lon = -122.3\nmapquest_api_key = \"k\"\n",
        )
        .unwrap();
        assert_eq!(config.poll_interval_secs, 20);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.user_agent.contains("https://github.com/"));
        assert!(config.include_yesterday);
        config.validate().unwrap();
    }

    #[test]
    fn missing_origin_is_a_parse_error() {
        assert!(matches!(
            WatcherConfig::parse("origin_lat = 47.6\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn key_override() {
        let config = WatcherConfig::parse("origin_lat = 47.6\norigin_lon = -122.3\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let config = config.with_api_key(Some("from-env".to_string()));
        assert_eq!(config.mapquest_api_key, "from-env");
        config.validate().unwrap();

        let config = config.with_api_key(Some("  ".to_string()));
        assert_eq!(config.mapquest_api_key, "from-env");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let base =
            WatcherConfig::parse("origin_lat = 47.6\norigin_lon = -122.3\nmapquest_api_key = \"k\"\n")
                .unwrap();

        let mut config = base.clone();
        config.origin_lat = 91.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = base.clone();
        config.origin_lon = -181.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = base;
        config.poll_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn missing_file_mentions_example() {
        let err = WatcherConfig::load(Path::new("/nonexistent/sea_fires/config.toml")).unwrap_err();
        assert!(err.to_string().contains("config.example.toml"));
    }
}
