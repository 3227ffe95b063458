use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A geographic coordinate.
///
/// The wire representation is the two-element JSON array `[lng, lat]`,
/// in that order on both sides of the bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Longitude in degrees
    pub lng: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lng, self.lat)
    }
}

impl Serialize for Coordinate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.lng)?;
        seq.serialize_element(&self.lat)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CoordinateVisitor;

        impl<'de> Visitor<'de> for CoordinateVisitor {
            type Value = Coordinate;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a [lng, lat] array of two numbers")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Coordinate, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let lng = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let lat = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                if seq.next_element::<f64>()?.is_some() {
                    return Err(de::Error::invalid_length(3, &self));
                }
                Ok(Coordinate { lng, lat })
            }
        }

        deserializer.deserialize_seq(CoordinateVisitor)
    }
}

/// Geographic bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// Camera state reported by the map runtime on every camera movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Camera center
    pub center: Coordinate,
    /// Zoom level
    pub zoom: f64,
    /// Bearing in degrees, clockwise from north
    pub bearing: f64,
    /// Pitch in degrees from the nadir
    pub pitch: f64,
    /// Currently visible area
    pub bounds: Bounds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_wire_order() {
        let coord = Coordinate::new(2.17, 41.38);
        let json = serde_json::to_string(&coord).unwrap();
        assert_eq!(json, "[2.17,41.38]");

        let parsed: Coordinate = serde_json::from_str("[2.17,41.38]").unwrap();
        assert_eq!(parsed.lng, 2.17);
        assert_eq!(parsed.lat, 41.38);
    }

    #[test]
    fn test_coordinate_rejects_wrong_arity() {
        assert!(serde_json::from_str::<Coordinate>("[2.17]").is_err());
        assert!(serde_json::from_str::<Coordinate>("[2.17,41.38,0.0]").is_err());
        assert!(serde_json::from_str::<Coordinate>("{\"lng\":2.17,\"lat\":41.38}").is_err());
    }

    #[test]
    fn test_view_state_roundtrip() {
        let view = ViewState {
            center: Coordinate::new(2.1, 41.4),
            zoom: 10.0,
            bearing: 0.0,
            pitch: 0.0,
            bounds: Bounds {
                west: 1.9,
                south: 41.2,
                east: 2.3,
                north: 41.6,
            },
        };

        let json = serde_json::to_string(&view).unwrap();
        let parsed: ViewState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, view);
    }
}
