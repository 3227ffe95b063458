//! Device location access
//!
//! The host queries the device position once at mount to center the map
//! near the user. Denied or unavailable access degrades to the
//! configured initial coordinates; it never blocks the mount.

use tracing::warn;

use vista_protocol::Coordinate;

/// Supplies the device's current coordinate, queried once at mount
pub trait LocationProvider {
    /// The current device coordinate, or `None` when access is denied or
    /// no fix is available
    fn current_location(&self) -> Option<Coordinate>;
}

/// Reads the device coordinate from the `VISTA_DEVICE_LOCATION`
/// environment variable ("lng,lat"), standing in for a platform
/// location service
pub struct EnvLocationProvider;

impl LocationProvider for EnvLocationProvider {
    fn current_location(&self) -> Option<Coordinate> {
        let raw = match std::env::var("VISTA_DEVICE_LOCATION") {
            Ok(raw) => raw,
            Err(_) => {
                warn!("Location access unavailable, using configured initial coordinates");
                return None;
            }
        };

        match parse_location(&raw) {
            Some(coordinate) => Some(coordinate),
            None => {
                warn!("Malformed VISTA_DEVICE_LOCATION '{}', ignoring", raw);
                None
            }
        }
    }
}

/// Parse a "lng,lat" pair
fn parse_location(raw: &str) -> Option<Coordinate> {
    let (lng, lat) = raw.split_once(',')?;
    let lng: f64 = lng.trim().parse().ok()?;
    let lat: f64 = lat.trim().parse().ok()?;
    Some(Coordinate::new(lng, lat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let coordinate = parse_location("2.17, 41.38").unwrap();
        assert_eq!(coordinate.lng, 2.17);
        assert_eq!(coordinate.lat, 41.38);

        assert!(parse_location("2.17").is_none());
        assert!(parse_location("2.17,north").is_none());
        assert!(parse_location("").is_none());
    }
}
