//! Web Mercator camera model
//!
//! Models the mapping library's camera: a center/zoom pair over a fixed
//! pixel viewport, with the visible bounds derived from the projection.
//! Bearing and pitch are carried in the view state but stay level; the
//! bridge never commands them.

use vista_protocol::{Bounds, Coordinate, ViewState};

/// Logical tile size of the projection, in pixels
const TILE_SIZE: f64 = 512.0;

/// Latitude limit of the Web Mercator projection
const MAX_LATITUDE: f64 = 85.051129;

/// Zoom range accepted from `setView`
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;

/// World size in pixels at a zoom level
fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project a coordinate to world pixels at a zoom level
pub fn project(coordinate: Coordinate, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let x = (coordinate.lng + 180.0) / 360.0 * size;

    let lat = coordinate.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let sin = lat.to_radians().sin();
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * std::f64::consts::PI)) * size;

    (x, y)
}

/// Inverse of `project`
pub fn unproject(x: f64, y: f64, zoom: f64) -> Coordinate {
    let size = world_size(zoom);
    let lng = x / size * 360.0 - 180.0;

    let n = std::f64::consts::PI * (1.0 - 2.0 * y / size);
    let lat = n.sinh().atan().to_degrees();

    Coordinate::new(lng, lat)
}

/// Camera over a fixed pixel viewport
#[derive(Debug, Clone)]
pub struct Camera {
    pub center: Coordinate,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
    /// Viewport size in pixels
    pub viewport: (u32, u32),
}

impl Camera {
    pub fn new(center: Coordinate, zoom: f64, viewport: (u32, u32)) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            bearing: 0.0,
            pitch: 0.0,
            viewport,
        }
    }

    /// Apply a `setView` command; an absent zoom keeps the current one
    pub fn set_view(&mut self, center: Coordinate, zoom: Option<f64>) {
        self.center = center;
        if let Some(zoom) = zoom {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Pan the camera by a lng/lat delta
    pub fn pan(&mut self, dlng: f64, dlat: f64) {
        self.center.lng += dlng;
        self.center.lat = (self.center.lat + dlat).clamp(-MAX_LATITUDE, MAX_LATITUDE);
    }

    /// Map a viewport pixel position to a coordinate
    pub fn screen_to_lng_lat(&self, px: f64, py: f64) -> Coordinate {
        let (cx, cy) = project(self.center, self.zoom);
        let (width, height) = self.viewport;
        unproject(
            cx + px - width as f64 / 2.0,
            cy + py - height as f64 / 2.0,
            self.zoom,
        )
    }

    /// Map a coordinate to a viewport pixel position
    pub fn lng_lat_to_screen(&self, coordinate: Coordinate) -> (f64, f64) {
        let (cx, cy) = project(self.center, self.zoom);
        let (x, y) = project(coordinate, self.zoom);
        let (width, height) = self.viewport;
        (
            x - cx + width as f64 / 2.0,
            y - cy + height as f64 / 2.0,
        )
    }

    /// Current view state, with the visible bounds derived from the
    /// viewport corners
    pub fn view_state(&self) -> ViewState {
        let (width, height) = self.viewport;
        let north_west = self.screen_to_lng_lat(0.0, 0.0);
        let south_east = self.screen_to_lng_lat(width as f64, height as f64);

        ViewState {
            center: self.center,
            zoom: self.zoom,
            bearing: self.bearing,
            pitch: self.pitch,
            bounds: Bounds {
                west: north_west.lng,
                south: south_east.lat,
                east: south_east.lng,
                north: north_west.lat,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let coordinate = Coordinate::new(2.17, 41.387);
        for zoom in [0.0, 5.0, 12.0, 18.0] {
            let (x, y) = project(coordinate, zoom);
            let back = unproject(x, y, zoom);
            assert!(close(back.lng, coordinate.lng), "lng at z{}", zoom);
            assert!(close(back.lat, coordinate.lat), "lat at z{}", zoom);
        }
    }

    #[test]
    fn test_viewport_center_maps_to_camera_center() {
        let camera = Camera::new(Coordinate::new(2.17, 41.387), 12.0, (1080, 1920));
        let center = camera.screen_to_lng_lat(540.0, 960.0);
        assert!(close(center.lng, 2.17));
        assert!(close(center.lat, 41.387));

        let (px, py) = camera.lng_lat_to_screen(Coordinate::new(2.17, 41.387));
        assert!(close(px, 540.0));
        assert!(close(py, 960.0));
    }

    #[test]
    fn test_view_state_bounds_surround_center() {
        let camera = Camera::new(Coordinate::new(2.17, 41.387), 12.0, (1080, 1920));
        let view = camera.view_state();

        assert!(view.bounds.west < view.center.lng);
        assert!(view.bounds.east > view.center.lng);
        assert!(view.bounds.south < view.center.lat);
        assert!(view.bounds.north > view.center.lat);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::new(Coordinate::new(0.0, 0.0), 12.0, (800, 600));
        camera.set_view(Coordinate::new(0.0, 0.0), Some(40.0));
        assert_eq!(camera.zoom, MAX_ZOOM);

        camera.set_view(Coordinate::new(0.0, 0.0), None);
        assert_eq!(camera.zoom, MAX_ZOOM);

        camera.set_view(Coordinate::new(0.0, 0.0), Some(-3.0));
        assert_eq!(camera.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_pan_clamps_latitude() {
        let mut camera = Camera::new(Coordinate::new(0.0, 84.0), 3.0, (800, 600));
        camera.pan(0.0, 10.0);
        assert!(camera.center.lat <= MAX_LATITUDE);
    }
}
