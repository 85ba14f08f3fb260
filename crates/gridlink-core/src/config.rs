//! Configuration loading and typed config structures for Gridlink.
//!
//! The canonical configuration lives in `gridlink.yaml` next to the server
//! binary. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty file is a valid configuration.

use std::path::Path;
use std::time::Duration;

use gridlink_types::RegionDescriptor;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Gridlink configuration.
///
/// Mirrors the structure of `gridlink.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GridlinkConfig {
    /// Neighbor directory settings.
    #[serde(default)]
    pub neighbors: NeighborConfig,

    /// Cross-region hand-off settings.
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Event retry queue settings.
    #[serde(default)]
    pub events: EventQueueConfig,

    /// Background worker pool settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Grid directory location.
    #[serde(default)]
    pub grid: GridConfig,

    /// HTTP ingress bind address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GridlinkConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override deployment values:
    /// - `GRIDLINK_HOST` overrides `server.host`
    /// - `GRIDLINK_PORT` overrides `server.port`
    /// - `GRID_DIRECTORY_URL` overrides `grid.directory_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or value is unusable.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml maps an empty document to unit, not to an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override deployment values with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `GRIDLINK_PORT` is not a port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("GRIDLINK_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("GRIDLINK_PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::Invalid {
                reason: format!("invalid GRIDLINK_PORT {val:?}: {e}"),
            })?;
        }
        if let Ok(val) = std::env::var("GRID_DIRECTORY_URL") {
            self.grid.directory_url = Some(val);
        }
        Ok(())
    }

    /// Reject values that would make the subsystem misbehave.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.neighbors.default_region_size <= 0 {
            return Err(ConfigError::Invalid {
                reason: "neighbors.default_region_size must be positive".to_owned(),
            });
        }
        if self.dispatch.workers == 0 {
            return Err(ConfigError::Invalid {
                reason: "dispatch.workers must be at least 1".to_owned(),
            });
        }
        if self.events.max_pending_per_region == 0 {
            return Err(ConfigError::Invalid {
                reason: "events.max_pending_per_region must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Neighbor directory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NeighborConfig {
    /// View radius measured in regions.
    #[serde(default = "default_view_regions")]
    pub view_regions: u32,

    /// Region edge length in meters used for view thresholds.
    #[serde(default = "default_region_size")]
    pub default_region_size: i32,

    /// When true, co-hosted regions always see each other.
    #[serde(default)]
    pub see_into_all_local_regions: bool,

    /// Per-agent draw distance based neighbor queries.
    #[serde(default)]
    pub variable_sight: VariableSightConfig,
}

impl NeighborConfig {
    /// View radius in meters for a region edge length.
    pub fn view_distance(&self, region_size: i32) -> i32 {
        i32::try_from(self.view_regions)
            .unwrap_or(i32::MAX)
            .saturating_mul(region_size)
    }
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            view_regions: default_view_regions(),
            default_region_size: default_region_size(),
            see_into_all_local_regions: false,
            variable_sight: VariableSightConfig::default(),
        }
    }
}

/// Variable sight distance configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariableSightConfig {
    /// Whether draw distance may widen or narrow the neighbor query.
    #[serde(default)]
    pub enabled: bool,

    /// Largest draw distance honored, in meters.
    #[serde(default = "default_max_sight_distance")]
    pub max_distance: i32,
}

impl Default for VariableSightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_distance: default_max_sight_distance(),
        }
    }
}

/// Cross-region hand-off configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HandoffConfig {
    /// Seconds an unreachable destination stays blacklisted.
    #[serde(default = "default_blacklist_cooldown_secs")]
    pub blacklist_cooldown_secs: u64,

    /// Timeout for the best-effort remote close call.
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,

    /// Timeout for every other remote call (none = transport default).
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl HandoffConfig {
    /// Blacklist cool-down as a [`Duration`].
    pub const fn blacklist_cooldown(&self) -> Duration {
        Duration::from_secs(self.blacklist_cooldown_secs)
    }

    /// Close call timeout as a [`Duration`].
    pub const fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Default request timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            blacklist_cooldown_secs: default_blacklist_cooldown_secs(),
            close_timeout_ms: default_close_timeout_ms(),
            request_timeout_ms: None,
        }
    }
}

/// Event retry queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventQueueConfig {
    /// Undelivered events kept per agent and region before the oldest drop.
    #[serde(default = "default_max_pending_per_region")]
    pub max_pending_per_region: usize,
}

impl Default for EventQueueConfig {
    fn default() -> Self {
        Self {
            max_pending_per_region: default_max_pending_per_region(),
        }
    }
}

/// Background worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchConfig {
    /// Maximum background tasks running at once.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Grid directory configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Base URL of a remote grid directory. When absent, an in-memory
    /// directory seeded from `regions` is used.
    #[serde(default)]
    pub directory_url: Option<String>,

    /// Regions hosted by this process. They also seed the in-memory
    /// directory when no `directory_url` is set.
    #[serde(default)]
    pub regions: Vec<RegionDescriptor>,
}

/// HTTP ingress bind address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG`
    /// is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_view_regions() -> u32 {
    1
}

const fn default_region_size() -> i32 {
    256
}

const fn default_max_sight_distance() -> i32 {
    512
}

const fn default_blacklist_cooldown_secs() -> u64 {
    60
}

const fn default_close_timeout_ms() -> u64 {
    10_000
}

const fn default_max_pending_per_region() -> usize {
    256
}

const fn default_workers() -> usize {
    8
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    9000
}

fn default_log_level() -> String {
    "info".to_owned()
}
