use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use vista_schema::{DurationMs, Validatable};

/// Map runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Vista Map Runtime Configuration")]
#[schemars(description = "Configuration for the Vista embedded map runtime")]
pub struct Config {
    /// Local IP address to bind the bridge socket
    #[serde(default = "default_local_ip")]
    #[schemars(description = "IP address to bind the bridge socket")]
    pub local_ip: String,

    /// Local port number
    #[serde(default = "default_local_port")]
    #[schemars(description = "Port number for the bridge socket", range(min = 1024, max = 65535))]
    pub local_port: u16,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[schemars(description = "Log level: trace, debug, info, warn, error")]
    #[schemars(regex(pattern = r"^(trace|debug|info|warn|error)$"))]
    pub log_level: String,

    /// Viewport width in pixels
    #[serde(default = "default_viewport_width")]
    #[schemars(description = "Simulated viewport width in pixels", range(min = 1))]
    pub viewport_width: u32,

    /// Viewport height in pixels
    #[serde(default = "default_viewport_height")]
    #[schemars(description = "Simulated viewport height in pixels", range(min = 1))]
    pub viewport_height: u32,

    /// Cluster radius in pixels
    #[serde(default = "default_cluster_radius_px")]
    #[schemars(description = "Markers within this pixel radius merge into a cluster", range(min = 1.0))]
    pub cluster_radius_px: f64,

    /// Minimum interval between region emissions during interaction
    #[serde(default = "default_region_throttle")]
    #[schemars(description = "Region emission interval. Accepts milliseconds or strings with ms/s suffix (default: 100ms)")]
    pub region_throttle: DurationMs,

    /// Reverse-geocoding service endpoint
    #[serde(default = "default_geocoder_endpoint")]
    #[schemars(description = "Base URL of the Nominatim-shaped geocoding service")]
    pub geocoder_endpoint: String,

    /// Whether map clicks trigger the address lookup workflow
    #[serde(default = "default_true")]
    #[schemars(description = "Place a temporary marker and reverse-geocode on empty-map clicks")]
    pub address_lookup_enabled: bool,

    /// Initial camera center longitude
    #[serde(default = "default_initial_lng")]
    #[schemars(description = "Camera longitude before the first setView", range(min = -180.0, max = 180.0))]
    pub initial_lng: f64,

    /// Initial camera center latitude
    #[serde(default = "default_initial_lat")]
    #[schemars(description = "Camera latitude before the first setView", range(min = -90.0, max = 90.0))]
    pub initial_lat: f64,

    /// Initial camera zoom
    #[serde(default = "default_initial_zoom")]
    #[schemars(description = "Camera zoom before the first setView", range(min = 0.0, max = 22.0))]
    pub initial_zoom: f64,

    /// Maximum inbound frame size in bytes
    #[serde(default = "default_max_frame_size")]
    #[schemars(description = "Maximum accepted bridge frame size in bytes")]
    pub max_frame_size: usize,
}

fn default_local_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_local_port() -> u16 {
    4377
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_viewport_width() -> u32 {
    1080
}

fn default_viewport_height() -> u32 {
    1920
}

fn default_cluster_radius_px() -> f64 {
    48.0
}

fn default_region_throttle() -> DurationMs {
    DurationMs(100)
}

fn default_geocoder_endpoint() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_true() -> bool {
    true
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
            local_ip: default_local_ip(),
            local_port: default_local_port(),
            log_level: default_log_level(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            cluster_radius_px: default_cluster_radius_px(),
            region_throttle: default_region_throttle(),
            geocoder_endpoint: default_geocoder_endpoint(),
            address_lookup_enabled: default_true(),
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
        assert_eq!(config.local_ip, "127.0.0.1");
        assert_eq!(config.local_port, 4377);
        assert_eq!(config.region_throttle.as_millis(), 100);
        assert!(config.address_lookup_enabled);
    }

    #[test]
    fn test_valid_json() {
        let json = r#"{
            "local_port": 5000,
            "cluster_radius_px": 64.0,
            "region_throttle": 50,
            "address_lookup_enabled": false
        }"#;

        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.local_port, 5000);
        assert_eq!(config.cluster_radius_px, 64.0);
        assert_eq!(config.region_throttle.as_millis(), 50);
        assert!(!config.address_lookup_enabled);
    }

    #[test]
    fn test_invalid_port() {
        let json = r#"{"local_port": 99999}"#;
        assert!(Config::from_json_str(json).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let json = r#"{"log_level": "chatty"}"#;
        assert!(Config::from_json_str(json).is_err());
    }
}
