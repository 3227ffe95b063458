//! Map runtime state and message handling
//!
//! The embedded side of the bridge. Owns the camera, the marker layer,
//! the highlight and the temporary click marker in one explicit state
//! struct; all mutation goes through its methods, and nothing is
//! host-readable. State crosses back only as emitted messages.
//!
//! # Handshake
//!
//! `ready` is emitted once per session, by `hello()`, only after the
//! session's inbound listener is attached. The host queues until then,
//! so every message is delivered exactly once.

use std::time::Instant;

use tracing::{debug, warn};

use vista_protocol::{AddressData, BridgeMessage, Coordinate};

use crate::camera::Camera;
use crate::config::Config;
use crate::input::Gesture;
use crate::layer::{MarkerLayer, RenderedFeature};
use crate::throttle::RegionThrottle;

/// Pick radius for click hit-testing, in pixels
const PICK_RADIUS_PX: f64 = 24.0;

/// Outcome of feeding one gesture to the runtime
#[derive(Debug, Default)]
pub struct GestureOutcome {
    /// Messages to emit to the host, in order
    pub messages: Vec<BridgeMessage>,
    /// Coordinate to reverse-geocode (click-to-address workflow)
    pub lookup: Option<Coordinate>,
}

/// The embedded map runtime for one host session
pub struct MapRuntime {
    camera: Camera,
    layer: MarkerLayer,
    highlighted: Option<String>,
    /// Temporary marker dropped at the last empty-map click
    click_marker: Option<Coordinate>,
    throttle: RegionThrottle,
    address_lookup_enabled: bool,
}

impl MapRuntime {
    pub fn new(config: &Config) -> Self {
        Self {
            camera: Camera::new(
                Coordinate::new(config.initial_lng, config.initial_lat),
                config.initial_zoom,
                (config.viewport_width, config.viewport_height),
            ),
            layer: MarkerLayer::new(config.cluster_radius_px),
            highlighted: None,
            click_marker: None,
            throttle: RegionThrottle::new(config.region_throttle.as_duration()),
            address_lookup_enabled: config.address_lookup_enabled,
        }
    }

    /// Messages announcing a freshly attached session: the readiness
    /// handshake followed by the initial camera state
    pub fn hello(&mut self, now: Instant) -> Vec<BridgeMessage> {
        let view = self.throttle.force(self.camera.view_state(), now);
        vec![BridgeMessage::Ready, BridgeMessage::region(&view)]
    }

    /// Process one host command, returning the messages to emit back
    pub fn handle_host_message(
        &mut self,
        message: BridgeMessage,
        now: Instant,
    ) -> Vec<BridgeMessage> {
        match message {
            BridgeMessage::SetView {
                center,
                zoom,
                duration,
            } => {
                debug!(
                    "setView to {} (zoom {:?}, ease {}ms)",
                    center,
                    zoom,
                    duration.unwrap_or(0)
                );
                self.camera.set_view(center, zoom);
                let view = self.throttle.force(self.camera.view_state(), now);
                vec![BridgeMessage::region(&view)]
            }
            BridgeMessage::SetData { features } => {
                debug!("Marker set replaced: {} features", features.len());
                self.layer.set_markers(features);
                Vec::new()
            }
            BridgeMessage::HighlightMarker { id } => {
                debug!("Highlight: {:?}", id);
                self.highlighted = id;
                Vec::new()
            }
            other => {
                warn!("Host echoed a runtime-bound message: {:?}", other);
                Vec::new()
            }
        }
    }

    /// Process one user gesture
    pub fn handle_gesture(&mut self, gesture: Gesture, now: Instant) -> GestureOutcome {
        match gesture {
            Gesture::Click { x, y } => self.handle_click(x, y, now),
            Gesture::Drag { dlng, dlat } => {
                self.camera.pan(dlng, dlat);
                let mut outcome = GestureOutcome::default();
                if let Some(view) = self.throttle.offer(self.camera.view_state(), now) {
                    outcome.messages.push(BridgeMessage::region(&view));
                }
                outcome
            }
            Gesture::End => {
                let mut outcome = GestureOutcome::default();
                if let Some(view) = self.throttle.finish(now) {
                    outcome.messages.push(BridgeMessage::region(&view));
                }
                outcome
            }
            Gesture::Quit => GestureOutcome::default(),
        }
    }

    /// Build the message for a completed click-to-address lookup;
    /// failed lookups stay silent and emit nothing
    pub fn address_resolved(
        &self,
        address: AddressData,
        coordinates: Coordinate,
    ) -> BridgeMessage {
        BridgeMessage::AddressLookup {
            address,
            coordinates,
        }
    }

    /// Currently highlighted marker id
    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    /// Temporary marker from the last empty-map click
    pub fn click_marker(&self) -> Option<Coordinate> {
        self.click_marker
    }

    /// Current camera zoom
    pub fn zoom(&self) -> f64 {
        self.camera.zoom
    }

    fn handle_click(&mut self, x: f64, y: f64, now: Instant) -> GestureOutcome {
        let features = self.layer.render(self.camera.zoom);
        let mut outcome = GestureOutcome::default();

        match MarkerLayer::hit_test(&features, &self.camera, x, y, PICK_RADIUS_PX) {
            Some(RenderedFeature::Point { id, position, label }) => {
                debug!("Marker {} ({}) tapped", id, label);
                outcome.messages.push(BridgeMessage::MarkerClick {
                    id: id.clone(),
                    lng_lat: *position,
                });
            }
            Some(RenderedFeature::Cluster {
                position,
                count,
                label,
                leaves,
            }) => {
                // Ease toward the zoom where the cluster's members separate
                let zoom = self.layer.expansion_zoom(leaves, self.camera.zoom);
                debug!("Cluster '{}' ({} members) tapped, easing to z{}", label, count, zoom);
                let position = *position;
                let leaves = leaves.clone();
                self.camera.set_view(position, Some(zoom));
                outcome
                    .messages
                    .push(BridgeMessage::ClusterClick { leaves });
                let view = self.throttle.force(self.camera.view_state(), now);
                outcome.messages.push(BridgeMessage::region(&view));
            }
            None => {
                let lng_lat = self.camera.screen_to_lng_lat(x, y);
                debug!("Map tapped at {}", lng_lat);
                self.click_marker = Some(lng_lat);
                outcome.messages.push(BridgeMessage::MapClick { lng_lat });
                if self.address_lookup_enabled {
                    outcome.lookup = Some(lng_lat);
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vista_protocol::Marker;

    fn config() -> Config {
        Config::default()
    }

    fn runtime() -> MapRuntime {
        MapRuntime::new(&config())
    }

    fn marker(id: &str, lng: f64, lat: f64) -> Marker {
        Marker {
            id: id.to_string(),
            coordinates: Coordinate::new(lng, lat),
            price_label: "1.000 €".to_string(),
        }
    }

    fn load_markers(runtime: &mut MapRuntime, markers: Vec<Marker>, now: Instant) {
        let out = runtime.handle_host_message(BridgeMessage::SetData { features: markers }, now);
        assert!(out.is_empty());
    }

    #[test]
    fn test_hello_leads_with_ready() {
        let mut runtime = runtime();
        let messages = runtime.hello(Instant::now());

        assert_eq!(messages[0], BridgeMessage::Ready);
        assert!(matches!(messages[1], BridgeMessage::Region { .. }));
    }

    #[test]
    fn test_set_view_moves_camera_and_reports_region() {
        let mut runtime = runtime();
        let out = runtime.handle_host_message(
            BridgeMessage::SetView {
                center: Coordinate::new(-3.7, 40.42),
                zoom: Some(9.0),
                duration: Some(350),
            },
            Instant::now(),
        );

        assert_eq!(out.len(), 1);
        let BridgeMessage::Region { center, zoom, .. } = &out[0] else {
            panic!("expected region, got {:?}", out[0]);
        };
        assert_eq!(*center, Coordinate::new(-3.7, 40.42));
        assert_eq!(*zoom, 9.0);
    }

    #[test]
    fn test_highlight_state_follows_commands() {
        let mut runtime = runtime();
        let now = Instant::now();

        runtime.handle_host_message(
            BridgeMessage::HighlightMarker {
                id: Some("lst-1".to_string()),
            },
            now,
        );
        assert_eq!(runtime.highlighted(), Some("lst-1"));

        runtime.handle_host_message(BridgeMessage::HighlightMarker { id: None }, now);
        assert_eq!(runtime.highlighted(), None);
    }

    #[test]
    fn test_empty_click_places_marker_and_requests_lookup() {
        let mut runtime = runtime();
        let now = Instant::now();

        let outcome = runtime.handle_gesture(Gesture::Click { x: 100.0, y: 100.0 }, now);
        assert_eq!(outcome.messages.len(), 1);
        assert!(matches!(outcome.messages[0], BridgeMessage::MapClick { .. }));
        assert!(outcome.lookup.is_some());
        assert!(runtime.click_marker().is_some());
    }

    #[test]
    fn test_lookup_workflow_respects_the_toggle() {
        let mut cfg = config();
        cfg.address_lookup_enabled = false;
        let mut runtime = MapRuntime::new(&cfg);

        let outcome =
            runtime.handle_gesture(Gesture::Click { x: 100.0, y: 100.0 }, Instant::now());
        assert!(matches!(outcome.messages[0], BridgeMessage::MapClick { .. }));
        assert!(outcome.lookup.is_none());
    }

    #[test]
    fn test_marker_click_hits_the_feature() {
        let mut runtime = runtime();
        let now = Instant::now();

        // One marker dead center, zoomed in enough to stay unclustered
        runtime.handle_host_message(
            BridgeMessage::SetView {
                center: Coordinate::new(2.1700, 41.3870),
                zoom: Some(16.0),
                duration: None,
            },
            now,
        );
        load_markers(
            &mut runtime,
            vec![marker("lst-1", 2.1700, 41.3870), marker("lst-2", 2.1344, 41.3762)],
            now,
        );

        let outcome = runtime.handle_gesture(Gesture::Click { x: 540.0, y: 960.0 }, now);
        assert_eq!(outcome.messages.len(), 1);
        let BridgeMessage::MarkerClick { id, .. } = &outcome.messages[0] else {
            panic!("expected markerClick, got {:?}", outcome.messages[0]);
        };
        assert_eq!(id, "lst-1");
        assert!(outcome.lookup.is_none());
    }

    #[test]
    fn test_cluster_click_reports_leaves_and_eases_in() {
        let mut runtime = runtime();
        let now = Instant::now();

        runtime.handle_host_message(
            BridgeMessage::SetView {
                center: Coordinate::new(2.1706, 41.3875),
                zoom: Some(11.0),
                duration: None,
            },
            now,
        );
        load_markers(
            &mut runtime,
            vec![marker("lst-1", 2.1700, 41.3870), marker("lst-2", 2.1712, 41.3881)],
            now,
        );
        let zoom_before = runtime.zoom();

        let outcome = runtime.handle_gesture(Gesture::Click { x: 540.0, y: 960.0 }, now);
        assert_eq!(outcome.messages.len(), 2);

        let BridgeMessage::ClusterClick { leaves } = &outcome.messages[0] else {
            panic!("expected clusterClick, got {:?}", outcome.messages[0]);
        };
        assert_eq!(leaves, &vec!["lst-1".to_string(), "lst-2".to_string()]);

        let BridgeMessage::Region { zoom, .. } = &outcome.messages[1] else {
            panic!("expected region, got {:?}", outcome.messages[1]);
        };
        assert!(*zoom > zoom_before);
    }

    #[test]
    fn test_drag_regions_are_throttled_with_trailing_flush() {
        let mut runtime = runtime();
        let start = Instant::now();

        let first = runtime.handle_gesture(
            Gesture::Drag {
                dlng: 0.001,
                dlat: 0.0,
            },
            start,
        );
        assert_eq!(first.messages.len(), 1);

        // Inside the window: withheld
        let second = runtime.handle_gesture(
            Gesture::Drag {
                dlng: 0.001,
                dlat: 0.0,
            },
            start + Duration::from_millis(20),
        );
        assert!(second.messages.is_empty());

        // Gesture end always delivers the final state
        let end = runtime.handle_gesture(Gesture::End, start + Duration::from_millis(30));
        assert_eq!(end.messages.len(), 1);
        let BridgeMessage::Region { center, .. } = &end.messages[0] else {
            panic!("expected region, got {:?}", end.messages[0]);
        };
        assert!((center.lng - (2.17 + 0.002)).abs() < 1e-9);
    }

    #[test]
    fn test_host_echo_of_runtime_message_is_dropped() {
        let mut runtime = runtime();
        let out = runtime.handle_host_message(BridgeMessage::Ready, Instant::now());
        assert!(out.is_empty());
    }
}
