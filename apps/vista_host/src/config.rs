use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use vista_schema::{DurationMs, Validatable};

/// Host application configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Vista Host Configuration")]
#[schemars(description = "Configuration for the Vista host application")]
pub struct Config {
    /// Address of the map runtime bridge socket
    #[serde(default = "default_runtime_addr")]
    #[schemars(description = "host:port the map runtime listens on")]
    pub runtime_addr: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[schemars(description = "Log level: trace, debug, info, warn, error")]
    #[schemars(regex(pattern = r"^(trace|debug|info|warn|error)$"))]
    pub log_level: String,

    /// Reverse-geocoding service endpoint
    #[serde(default = "default_geocoder_endpoint")]
    #[schemars(description = "Base URL of the Nominatim-shaped geocoding service")]
    pub geocoder_endpoint: String,

    /// How long to wait for the runtime's ready message before degrading
    #[serde(default = "default_ready_timeout")]
    #[schemars(description = "Readiness deadline. Accepts milliseconds or strings with ms/s suffix (default: 1500ms)")]
    pub ready_timeout: DurationMs,

    /// Initial camera center longitude
    #[serde(default = "default_initial_lng")]
    #[schemars(description = "Initial camera longitude, used when no device location and no restored view is available", range(min = -180.0, max = 180.0))]
    pub initial_lng: f64,

    /// Initial camera center latitude
    #[serde(default = "default_initial_lat")]
    #[schemars(description = "Initial camera latitude, used when no device location and no restored view is available", range(min = -90.0, max = 90.0))]
    pub initial_lat: f64,

    /// Initial camera zoom
    #[serde(default = "default_initial_zoom")]
    #[schemars(description = "Initial camera zoom level", range(min = 0.0, max = 22.0))]
    pub initial_zoom: f64,

    /// Maximum inbound frame size in bytes
    #[serde(default = "default_max_frame_size")]
    #[schemars(description = "Maximum accepted bridge frame size in bytes")]
    pub max_frame_size: usize,
}

fn default_runtime_addr() -> String {
    "127.0.0.1:4377".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_geocoder_endpoint() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_ready_timeout() -> DurationMs {
    DurationMs(1500)
}

fn default_initial_lng() -> f64 {
    2.17
}

fn default_initial_lat() -> f64 {
    41.387
}

fn default_initial_zoom() -> f64 {
    12.0
}

fn default_max_frame_size() -> usize {
    vista_protocol::DEFAULT_MAX_FRAME_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime_addr: default_runtime_addr(),
            log_level: default_log_level(),
            geocoder_endpoint: default_geocoder_endpoint(),
            ready_timeout: default_ready_timeout(),
            initial_lng: default_initial_lng(),
            initial_lat: default_initial_lat(),
            initial_zoom: default_initial_zoom(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl Validatable for Config {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.runtime_addr, "127.0.0.1:4377");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.ready_timeout.as_millis(), 1500);
        assert_eq!(config.initial_zoom, 12.0);
    }

    #[test]
    fn test_valid_json() {
        let json = r#"{
            "runtime_addr": "127.0.0.1:5000",
            "log_level": "debug",
            "ready_timeout": "2s",
            "initial_zoom": 9.5
        }"#;

        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.runtime_addr, "127.0.0.1:5000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.ready_timeout.as_millis(), 2000);
        assert_eq!(config.initial_zoom, 9.5);
        // Unspecified fields fall back to defaults
        assert_eq!(config.initial_lng, 2.17);
    }

    #[test]
    fn test_invalid_log_level() {
        let json = r#"{"log_level": "verbose"}"#;
        assert!(Config::from_json_str(json).is_err());
    }

    #[test]
    fn test_out_of_range_zoom() {
        let json = r#"{"initial_zoom": 40.0}"#;
        assert!(Config::from_json_str(json).is_err());
    }
}
