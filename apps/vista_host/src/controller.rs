//! Host map controller
//!
//! The component-side end of the bridge. Queues outbound messages until
//! the runtime signals readiness, deduplicates marker updates, persists
//! view/marker state per logical screen, and exposes the imperative API
//! the consuming screen calls (navigate, highlight, reverse-geocode).
//!
//! # Readiness
//!
//! `Uninitialized → AwaitingReady → Ready`. Messages posted before
//! `Ready` queue in arrival order and are flushed exactly once, in FIFO
//! order, on the transition. If the deadline passes with messages
//! pending and no `ready`, the controller moves to the explicit
//! `Degraded` state instead of assuming success: the queue is flushed
//! for liveness and the status change is surfaced to the caller. A late
//! `ready` upgrades `Degraded` to `Ready` without re-flushing.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use vista_geocode::GeocodeClient;
use vista_protocol::{AddressData, BridgeMessage, Coordinate, Marker, ViewState};

use crate::cache::{ViewStateCache, markers_equal};
use crate::transport::BridgeTransport;

/// Bridge readiness states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    /// Constructed but not mounted
    Uninitialized,
    /// Mounted, waiting for the runtime's `ready`
    AwaitingReady,
    /// The runtime confirmed readiness
    Ready,
    /// The readiness deadline passed; dispatch is unblocked but the
    /// runtime never confirmed
    Degraded,
}

/// Events surfaced to the consuming screen
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Bridge readiness changed
    StatusChanged(BridgeStatus),
    /// The user tapped an empty map area
    MapClick { lng_lat: Coordinate },
    /// The user tapped a marker
    MarkerClick { id: String, lng_lat: Coordinate },
    /// The user tapped a cluster
    ClusterClick { leaves: Vec<String> },
    /// The runtime resolved a tapped position to an address
    AddressResolved {
        address: AddressData,
        coordinates: Coordinate,
    },
    /// The camera moved
    RegionChanged(ViewState),
}

/// Controller construction options
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Screen identifier scoping the view cache; `None` disables caching
    pub screen_id: Option<String>,
    /// Restore the cached camera/markers on mount instead of the
    /// supplied initial values
    pub restore_view: bool,
    /// Initial camera center used when nothing is restored
    pub initial_center: Coordinate,
    /// Initial camera zoom used when nothing is restored
    pub initial_zoom: f64,
    /// How long to wait for `ready` before degrading
    pub ready_timeout: Duration,
}

/// Host-side bridge controller for one mounted map component
pub struct MapController {
    transport: Box<dyn BridgeTransport>,
    geocoder: GeocodeClient,
    cache: ViewStateCache,
    options: ControllerOptions,
    status: BridgeStatus,
    /// Outbound messages awaiting readiness, in arrival order
    pending: VecDeque<String>,
    ready_deadline: Option<Instant>,
    /// Marker set last handed to the transport by this controller
    last_sent_markers: Option<Vec<Marker>>,
    flushed: bool,
    detached: bool,
}

impl MapController {
    pub fn new(
        transport: Box<dyn BridgeTransport>,
        geocoder: GeocodeClient,
        cache: ViewStateCache,
        options: ControllerOptions,
    ) -> Self {
        Self {
            transport,
            geocoder,
            cache,
            options,
            status: BridgeStatus::Uninitialized,
            pending: VecDeque::new(),
            ready_deadline: None,
            last_sent_markers: None,
            flushed: false,
            detached: false,
        }
    }

    /// Current bridge readiness
    pub fn status(&self) -> BridgeStatus {
        self.status
    }

    /// The host-side geocoding client
    pub fn geocoder(&self) -> &GeocodeClient {
        &self.geocoder
    }

    /// Begin the session: queue the initial camera (and, when restoring,
    /// the cached markers) and start waiting for `ready`
    pub fn mount(&mut self) {
        if self.status != BridgeStatus::Uninitialized {
            warn!("mount() called twice, ignoring");
            return;
        }
        self.status = BridgeStatus::AwaitingReady;

        let snapshot = match (&self.options.screen_id, self.options.restore_view) {
            (Some(screen), true) => self.cache.snapshot(screen),
            _ => None,
        };

        let (center, zoom) = snapshot
            .as_ref()
            .and_then(|s| s.view)
            .map(|v| (v.center, v.zoom))
            .unwrap_or((self.options.initial_center, self.options.initial_zoom));

        if let Some(screen) = &self.options.screen_id {
            debug!(screen = %screen, "Mounting map screen at {} z{}", center, zoom);
        }

        self.post(&BridgeMessage::SetView {
            center,
            zoom: Some(zoom),
            duration: None,
        });

        if let Some(snapshot) = snapshot {
            if !snapshot.markers.is_empty() {
                self.post(&BridgeMessage::SetData {
                    features: snapshot.markers.clone(),
                });
                self.last_sent_markers = Some(snapshot.markers);
            }
        }
    }

    /// Serialize and transmit, or queue while the runtime is not ready
    pub fn post(&mut self, message: &BridgeMessage) {
        if self.detached {
            debug!("Dropping bridge message after detach");
            return;
        }

        let text = match message.to_text() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize bridge message: {}", e);
                return;
            }
        };

        match self.status {
            BridgeStatus::Ready | BridgeStatus::Degraded => self.transmit(text),
            BridgeStatus::Uninitialized | BridgeStatus::AwaitingReady => {
                self.pending.push_back(text);
                if self.ready_deadline.is_none() {
                    self.ready_deadline = Some(Instant::now() + self.options.ready_timeout);
                }
            }
        }
    }

    /// Post a `setView` command; guarantees eventual camera movement,
    /// not synchronous completion
    pub fn navigate_to_location(&mut self, center: Coordinate, zoom: Option<f64>) {
        self.post(&BridgeMessage::SetView {
            center,
            zoom,
            duration: None,
        });
    }

    /// Post a `highlightMarker` command; `None` clears any highlight
    pub fn highlight_marker(&mut self, id: Option<&str>) {
        self.post(&BridgeMessage::HighlightMarker {
            id: id.map(Into::into),
        });
    }

    /// Replace the marker set, skipping the transmission when the set is
    /// structurally unchanged from the last one sent
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        if self
            .last_sent_markers
            .as_deref()
            .is_some_and(|last| markers_equal(last, &markers))
        {
            debug!(
                "Marker set unchanged ({} markers), skipping setData",
                markers.len()
            );
            return;
        }

        if let Some(screen) = &self.options.screen_id {
            self.cache.record_markers(screen, &markers);
        }

        self.post(&BridgeMessage::SetData {
            features: markers.clone(),
        });
        self.last_sent_markers = Some(markers);
    }

    /// Resolve a coordinate to an address over the host's own network
    /// path; failures resolve to `None`, never an error
    pub async fn lookup_address(&self, coordinates: Coordinate) -> Option<AddressData> {
        self.geocoder.reverse(coordinates).await
    }

    /// Process one runtime message, returning the event to surface
    pub fn handle_message(&mut self, message: BridgeMessage) -> Option<HostEvent> {
        match message {
            BridgeMessage::Ready => {
                self.ready_deadline = None;
                if self.status == BridgeStatus::Ready {
                    debug!("Duplicate ready, ignoring");
                    return None;
                }
                self.status = BridgeStatus::Ready;
                self.flush_pending();
                Some(HostEvent::StatusChanged(BridgeStatus::Ready))
            }
            BridgeMessage::Region {
                center,
                zoom,
                bearing,
                pitch,
                bounds,
            } => {
                let view = ViewState {
                    center,
                    zoom,
                    bearing,
                    pitch,
                    bounds,
                };
                if let Some(screen) = &self.options.screen_id {
                    self.cache.record_view(screen, &view);
                }
                Some(HostEvent::RegionChanged(view))
            }
            BridgeMessage::MapClick { lng_lat } => Some(HostEvent::MapClick { lng_lat }),
            BridgeMessage::MarkerClick { id, lng_lat } => {
                Some(HostEvent::MarkerClick { id, lng_lat })
            }
            BridgeMessage::ClusterClick { leaves } => Some(HostEvent::ClusterClick { leaves }),
            BridgeMessage::AddressLookup {
                address,
                coordinates,
            } => Some(HostEvent::AddressResolved {
                address,
                coordinates,
            }),
            BridgeMessage::SetView { .. }
            | BridgeMessage::SetData { .. }
            | BridgeMessage::HighlightMarker { .. } => {
                warn!("Runtime echoed a host-bound message, ignoring");
                None
            }
        }
    }

    /// Degrade the bridge when the readiness deadline has passed with
    /// messages still pending
    pub fn check_ready_deadline(&mut self, now: Instant) -> Option<HostEvent> {
        if self.status != BridgeStatus::AwaitingReady {
            return None;
        }
        let deadline = self.ready_deadline?;
        if now < deadline {
            return None;
        }

        warn!(
            "Map runtime readiness timed out after {:?} with {} messages pending, degrading bridge",
            self.options.ready_timeout,
            self.pending.len()
        );
        self.status = BridgeStatus::Degraded;
        self.ready_deadline = None;
        self.flush_pending();
        Some(HostEvent::StatusChanged(BridgeStatus::Degraded))
    }

    /// Stop all further dispatch; in-flight lookups are not retracted
    pub fn detach(&mut self) {
        self.detached = true;
        debug!("Map controller detached");
    }

    fn flush_pending(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;

        let count = self.pending.len();
        while let Some(text) = self.pending.pop_front() {
            self.transmit(text);
        }
        if count > 0 {
            debug!("Flushed {} queued bridge messages", count);
        }
    }

    fn transmit(&self, text: String) {
        // No retry; the UI continues with stale state on failure
        if let Err(e) = self.transport.send(&text) {
            warn!("Bridge transmission failed: {}", e);
        }
    }
}
