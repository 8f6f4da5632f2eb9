use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Real-time tracking configuration
    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Configuration for the real-time tracking core
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Maximum age in minutes before a cached location is evicted (default: 30)
    #[serde(default = "TrackingConfig::default_location_ttl_minutes")]
    pub location_ttl_minutes: u64,
    /// Interval in minutes between eviction sweeps (default: 10)
    #[serde(default = "TrackingConfig::default_sweep_interval_minutes")]
    pub sweep_interval_minutes: u64,
    /// Capacity of each connection's outbound message queue (default: 32).
    /// A connection that cannot drain its queue is disconnected.
    #[serde(default = "TrackingConfig::default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Floor speed in km/h for the distance-based ETA estimate (default: 20).
    /// Keeps ETAs sane when the schedule projection collapses under delay.
    #[serde(default = "TrackingConfig::default_floor_speed_kmh")]
    pub floor_speed_kmh: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            location_ttl_minutes: Self::default_location_ttl_minutes(),
            sweep_interval_minutes: Self::default_sweep_interval_minutes(),
            outbound_queue_capacity: Self::default_outbound_queue_capacity(),
            floor_speed_kmh: Self::default_floor_speed_kmh(),
        }
    }
}

impl TrackingConfig {
    fn default_location_ttl_minutes() -> u64 {
        30
    }
    fn default_sweep_interval_minutes() -> u64 {
        10
    }
    fn default_outbound_queue_capacity() -> usize {
        32
    }
    fn default_floor_speed_kmh() -> f64 {
        20.0
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
