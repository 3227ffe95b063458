//! Per-screen view state cache
//!
//! Keyed by an opaque screen identifier, so returning to a logical
//! application screen can restore the last-known camera and markers
//! without a network round-trip. Entries live for the process lifetime
//! and are mutated only by the controller handling bridge messages.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use vista_protocol::{Bounds, Coordinate, Marker, ViewState};

/// Camera portion of a screen snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedView {
    pub center: Coordinate,
    pub zoom: f64,
    pub bounds: Bounds,
}

/// Last-known map state for one logical application screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenSnapshot {
    /// Last camera state; absent until the first region event arrives
    pub view: Option<SavedView>,
    /// Last marker set transmitted for this screen
    pub markers: Vec<Marker>,
}

/// Structural marker-set comparison: length, then per-index
/// id/coordinates/label
pub fn markers_equal(a: &[Marker], b: &[Marker]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).all(|(x, y)| {
        x.id == y.id && x.coordinates == y.coordinates && x.price_label == y.price_label
    })
}

/// Process-lifetime cache of per-screen map state
///
/// Shared across controllers via `Clone`; entries are never removed.
#[derive(Clone, Default)]
pub struct ViewStateCache {
    screens: Arc<RwLock<HashMap<String, ScreenSnapshot>>>,
}

impl ViewStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the snapshot for a screen, if any
    pub fn snapshot(&self, screen: &str) -> Option<ScreenSnapshot> {
        self.screens.read().unwrap().get(screen).cloned()
    }

    /// Overwrite the cached camera state for a screen, creating the
    /// snapshot on the first event
    pub fn record_view(&self, screen: &str, view: &ViewState) {
        let mut screens = self.screens.write().unwrap();
        let snapshot = screens.entry(screen.to_string()).or_default();
        snapshot.view = Some(SavedView {
            center: view.center,
            zoom: view.zoom,
            bounds: view.bounds,
        });
    }

    /// Overwrite the cached marker set for a screen when it structurally
    /// differs from the stored one; returns whether a write happened
    pub fn record_markers(&self, screen: &str, markers: &[Marker]) -> bool {
        let mut screens = self.screens.write().unwrap();
        let snapshot = screens.entry(screen.to_string()).or_default();
        if markers_equal(&snapshot.markers, markers) {
            return false;
        }
        snapshot.markers = markers.to_vec();
        true
    }

    /// Number of screens with a cached snapshot
    pub fn screen_count(&self) -> usize {
        self.screens.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str, lng: f64, lat: f64, label: &str) -> Marker {
        Marker {
            id: id.to_string(),
            coordinates: Coordinate::new(lng, lat),
            price_label: label.to_string(),
        }
    }

    fn view(lng: f64, lat: f64, zoom: f64) -> ViewState {
        ViewState {
            center: Coordinate::new(lng, lat),
            zoom,
            bearing: 0.0,
            pitch: 0.0,
            bounds: Bounds {
                west: lng - 0.2,
                south: lat - 0.2,
                east: lng + 0.2,
                north: lat + 0.2,
            },
        }
    }

    #[test]
    fn test_markers_equal_structural() {
        let a = vec![marker("a", 2.1, 41.4, "900 €"), marker("b", 2.2, 41.5, "1.100 €")];
        let same = a.clone();
        assert!(markers_equal(&a, &same));

        // Different length
        assert!(!markers_equal(&a, &a[..1]));

        // Different label at one index
        let mut relabeled = a.clone();
        relabeled[1].price_label = "1.200 €".to_string();
        assert!(!markers_equal(&a, &relabeled));

        // Different coordinates at one index
        let mut moved = a.clone();
        moved[0].coordinates = Coordinate::new(2.11, 41.4);
        assert!(!markers_equal(&a, &moved));

        // Same members in a different order are a different set
        let swapped = vec![a[1].clone(), a[0].clone()];
        assert!(!markers_equal(&a, &swapped));
    }

    #[test]
    fn test_record_view_creates_and_overwrites() {
        let cache = ViewStateCache::new();
        assert!(cache.snapshot("search").is_none());

        cache.record_view("search", &view(2.1, 41.4, 10.0));
        let saved = cache.snapshot("search").unwrap().view.unwrap();
        assert_eq!(saved.center, Coordinate::new(2.1, 41.4));
        assert_eq!(saved.zoom, 10.0);

        cache.record_view("search", &view(2.3, 41.5, 12.0));
        let saved = cache.snapshot("search").unwrap().view.unwrap();
        assert_eq!(saved.center, Coordinate::new(2.3, 41.5));
        assert_eq!(saved.zoom, 12.0);
        assert_eq!(cache.screen_count(), 1);
    }

    #[test]
    fn test_record_markers_only_writes_on_change() {
        let cache = ViewStateCache::new();
        let set = vec![marker("a", 2.1, 41.4, "900 €")];

        assert!(cache.record_markers("search", &set));
        assert!(!cache.record_markers("search", &set));

        let changed = vec![marker("a", 2.1, 41.4, "950 €")];
        assert!(cache.record_markers("search", &changed));
        assert_eq!(cache.snapshot("search").unwrap().markers, changed);
    }

    #[test]
    fn test_screens_are_independent() {
        let cache = ViewStateCache::new();
        cache.record_view("search", &view(2.1, 41.4, 10.0));
        cache.record_view("favorites", &view(-3.7, 40.4, 9.0));

        assert_eq!(cache.screen_count(), 2);
        let search = cache.snapshot("search").unwrap().view.unwrap();
        assert_eq!(search.center, Coordinate::new(2.1, 41.4));
    }
}
