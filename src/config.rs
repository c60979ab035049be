//! Configuration file support for polymap.
//!
//! Settings are stored as JSON. A missing field falls back to its default, so
//! older files keep loading as new settings are added. Two environment
//! variables override the Overpass section after loading:
//! `POLYMAP_OVERPASS_ENDPOINT` and `POLYMAP_OVERPASS_TIMEOUT_SECS`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CATEGORY_KEY, DEFAULT_MAX_ZOOM, DEFAULT_OVERPASS_ENDPOINT, DEFAULT_POLYGON_NAME,
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_SERVER_TIMEOUT_SECS,
};
use crate::sync::{SyncSettings, UpdateOrdering};

/// Environment variable overriding the Overpass endpoint.
pub const ENDPOINT_ENV: &str = "POLYMAP_OVERPASS_ENDPOINT";

/// Environment variable overriding the query timeout in seconds.
pub const TIMEOUT_ENV: &str = "POLYMAP_OVERPASS_TIMEOUT_SECS";

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Feature query service
    #[serde(default)]
    pub overpass: OverpassConfig,

    /// Map viewport behavior
    #[serde(default)]
    pub map: MapConfig,

    /// Polygon synchronization behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Overpass section of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverpassConfig {
    /// Interpreter URL the query is posted to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Client-side request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout written into the query for the server, in seconds
    #[serde(default = "default_server_timeout_secs")]
    pub server_timeout_secs: u64,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_endpoint() -> String {
    DEFAULT_OVERPASS_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_QUERY_TIMEOUT_SECS
}

fn default_server_timeout_secs() -> u64 {
    DEFAULT_SERVER_TIMEOUT_SECS
}

impl OverpassConfig {
    /// Client-side timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            server_timeout_secs: default_server_timeout_secs(),
            headers: BTreeMap::new(),
        }
    }
}

/// Map section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Maximum zoom when framing a feature
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
}

fn default_max_zoom() -> f64 {
    DEFAULT_MAX_ZOOM
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            max_zoom: default_max_zoom(),
        }
    }
}

/// Sync section of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Name used when no name prompt is available
    #[serde(default = "default_name")]
    pub default_name: String,

    /// Tag that features are queried by and colored by
    #[serde(default = "default_category_key")]
    pub category_key: String,

    /// How overlapping updates of one polygon resolve
    #[serde(default)]
    pub update_ordering: UpdateOrdering,
}

fn default_name() -> String {
    DEFAULT_POLYGON_NAME.to_string()
}

fn default_category_key() -> String {
    DEFAULT_CATEGORY_KEY.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_name: default_name(),
            category_key: default_category_key(),
            update_ordering: UpdateOrdering::default(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            overpass: OverpassConfig::default(),
            map: MapConfig::default(),
            sync: SyncConfig::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Settings for the sync engine.
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            category_key: self.sync.category_key.clone(),
            max_zoom: self.map.max_zoom,
            update_ordering: self.sync.update_ordering,
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Apply environment overrides using the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            self.overpass.endpoint = endpoint.trim().to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.overpass.timeout_secs = secs,
                _ => log::warn!("Ignoring invalid {}={:?}", TIMEOUT_ENV, raw),
            }
        }
        self
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "polymap-config.json"
    }

    /// Get the default config file path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("polymap").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("polymap")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {:?}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<std::path::PathBuf, ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(&path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut config = AppConfig::new();
        config.sync.update_ordering = UpdateOrdering::LatestIssued;
        config
            .overpass
            .headers
            .insert("User-Agent".to_string(), "polymap-test".to_string());

        let json = config.to_json().unwrap();
        assert_eq!(AppConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = AppConfig::from_json(r#"{ "version": 1 }"#).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.overpass.timeout(), Duration::from_secs(10));
        assert_eq!(config.sync.category_key, "amenity");
        assert_eq!(config.map.max_zoom, 16.0);
    }

    #[test]
    fn test_map_section_holds_only_max_zoom() {
        let json = AppConfig::new().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["map"], serde_json::json!({ "max_zoom": 16.0 }));

        // Files written with viewport defaults still load.
        let config = AppConfig::from_json(
            r#"{ "version": 1, "map": { "max_zoom": 12, "default_center": [0, 0], "default_zoom": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.map.max_zoom, 12.0);
    }

    #[test]
    fn test_version_too_new() {
        let result = AppConfig::from_json(r#"{ "version": 99 }"#);
        assert!(matches!(
            result,
            Err(ConfigError::VersionTooNew {
                file_version: 99,
                ..
            })
        ));
    }

    #[test]
    fn test_update_ordering_names() {
        let config =
            AppConfig::from_json(r#"{ "version": 1, "sync": { "update_ordering": "latest_issued" } }"#)
                .unwrap();
        assert_eq!(config.sync.update_ordering, UpdateOrdering::LatestIssued);
        assert_eq!(config.sync.default_name, "Untitled");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::new().with_overrides(|key| match key {
            ENDPOINT_ENV => Some(" http://localhost:12345/api/interpreter ".to_string()),
            TIMEOUT_ENV => Some("3".to_string()),
            _ => None,
        });
        assert_eq!(config.overpass.endpoint, "http://localhost:12345/api/interpreter");
        assert_eq!(config.overpass.timeout_secs, 3);

        let unchanged = AppConfig::new().with_overrides(|key| match key {
            TIMEOUT_ENV => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(unchanged.overpass.timeout_secs, DEFAULT_QUERY_TIMEOUT_SECS);
    }

    #[test]
    fn test_sync_settings() {
        let settings = AppConfig::new().sync_settings();
        assert_eq!(settings.category_key, "amenity");
        assert_eq!(settings.update_ordering, UpdateOrdering::LastResolved);
    }
}
