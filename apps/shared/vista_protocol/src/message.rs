use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Coordinate, ViewState};

/// A price-labeled map marker for a single listing
///
/// Identity is `id`. Marker sets are replaced wholesale per update,
/// never patched individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Listing identifier
    pub id: String,
    /// Marker position
    pub coordinates: Coordinate,
    /// Formatted price shown on the marker (e.g., "1.250 €")
    pub price_label: String,
}

/// Structured reverse-geocoding result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressData {
    /// Free-form display label for the whole address
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Bridge protocol messages exchanged between the host application and
/// the embedded map runtime
///
/// The sole data crossing the embedding boundary, always JSON-serialized
/// text, internally tagged on `type` with camelCase tags and fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeMessage {
    // Runtime -> Host messages
    /// Emitted once by the runtime after its inbound listener is attached
    /// and the map has painted; unlocks host-side dispatch
    Ready,

    /// The user tapped an empty map area
    #[serde(rename_all = "camelCase")]
    MapClick {
        /// Tapped position
        lng_lat: Coordinate,
    },

    /// The user tapped a single marker
    #[serde(rename_all = "camelCase")]
    MarkerClick {
        /// Listing identifier of the tapped marker
        id: String,
        /// Marker position
        lng_lat: Coordinate,
    },

    /// The user tapped a cluster; the runtime eases toward the cluster's
    /// expansion zoom and reports the member ids
    ClusterClick {
        /// Listing identifiers of the cluster's members
        leaves: Vec<String>,
    },

    /// Result of the runtime-side click-to-geocode workflow
    AddressLookup {
        /// Resolved address
        address: AddressData,
        /// Position the lookup was issued for
        coordinates: Coordinate,
    },

    /// Camera movement report, throttled during continuous interaction
    Region {
        center: Coordinate,
        zoom: f64,
        bearing: f64,
        pitch: f64,
        bounds: Bounds,
    },

    // Host -> Runtime messages
    /// Move the camera; eventual movement, not synchronous completion
    SetView {
        /// Target center
        center: Coordinate,
        /// Target zoom (kept when absent)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zoom: Option<f64>,
        /// Ease duration in milliseconds (runtime default when absent)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },

    /// Replace the marker set wholesale
    SetData {
        /// The complete new marker set
        features: Vec<Marker>,
    },

    /// Visually flag one marker as highlighted; `null` clears any highlight
    HighlightMarker {
        /// Marker to highlight, or `None` to clear
        id: Option<String>,
    },
}

impl BridgeMessage {
    /// Serialize to the JSON text form carried by the transport
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from the JSON text form carried by the transport
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Build a `Region` message from a runtime view state
    pub fn region(view: &ViewState) -> Self {
        BridgeMessage::Region {
            center: view.center,
            zoom: view.zoom,
            bearing: view.bearing,
            pitch: view.pitch,
            bounds: view.bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_wire_form() {
        let text = BridgeMessage::Ready.to_text().unwrap();
        assert_eq!(text, r#"{"type":"ready"}"#);
        assert_eq!(BridgeMessage::from_text(&text).unwrap(), BridgeMessage::Ready);
    }

    #[test]
    fn test_map_click_wire_form() {
        let msg = BridgeMessage::MapClick {
            lng_lat: Coordinate::new(2.17, 41.38),
        };
        assert_eq!(
            msg.to_text().unwrap(),
            r#"{"type":"mapClick","lngLat":[2.17,41.38]}"#
        );
    }

    #[test]
    fn test_set_view_omits_absent_fields() {
        let msg = BridgeMessage::SetView {
            center: Coordinate::new(2.1, 41.4),
            zoom: None,
            duration: None,
        };
        assert_eq!(msg.to_text().unwrap(), r#"{"type":"setView","center":[2.1,41.4]}"#);

        let msg = BridgeMessage::SetView {
            center: Coordinate::new(2.1, 41.4),
            zoom: Some(10.0),
            duration: Some(350),
        };
        assert_eq!(
            msg.to_text().unwrap(),
            r#"{"type":"setView","center":[2.1,41.4],"zoom":10.0,"duration":350}"#
        );
    }

    #[test]
    fn test_highlight_marker_null_is_explicit() {
        // Clearing the highlight must serialize the null, not drop the field
        let msg = BridgeMessage::HighlightMarker { id: None };
        assert_eq!(msg.to_text().unwrap(), r#"{"type":"highlightMarker","id":null}"#);

        let msg = BridgeMessage::HighlightMarker {
            id: Some("lst-204".to_string()),
        };
        assert_eq!(
            msg.to_text().unwrap(),
            r#"{"type":"highlightMarker","id":"lst-204"}"#
        );
    }

    #[test]
    fn test_set_data_camel_case_fields() {
        let msg = BridgeMessage::SetData {
            features: vec![Marker {
                id: "lst-1".to_string(),
                coordinates: Coordinate::new(2.15, 41.39),
                price_label: "980 €".to_string(),
            }],
        };
        assert_eq!(
            msg.to_text().unwrap(),
            r#"{"type":"setData","features":[{"id":"lst-1","coordinates":[2.15,41.39],"priceLabel":"980 €"}]}"#
        );
    }

    #[test]
    fn test_region_roundtrip() {
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
        let msg = BridgeMessage::region(&view);
        let parsed = BridgeMessage::from_text(&msg.to_text().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert!(BridgeMessage::from_text(r#"{"type":"teleport"}"#).is_err());
    }
}
