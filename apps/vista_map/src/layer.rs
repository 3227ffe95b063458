//! Marker and cluster layer
//!
//! Merges markers within a configurable pixel radius at the current zoom
//! into cluster nodes labeled with an abbreviated count, the way the
//! mapping library's point-cluster source behaves. The grid is keyed in
//! world pixels, so the same marker set clusters at low zoom and
//! separates as the camera zooms in.

use std::collections::BTreeMap;

use vista_protocol::{Coordinate, Marker};

use crate::camera::{Camera, project};

/// Highest zoom the expansion search will reach
const MAX_CLUSTER_ZOOM: f64 = 20.0;

/// A drawable feature produced by clustering at a given zoom
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedFeature {
    /// A single marker
    Point {
        id: String,
        position: Coordinate,
        label: String,
    },
    /// An aggregate of nearby markers
    Cluster {
        position: Coordinate,
        count: usize,
        label: String,
        /// Member marker ids
        leaves: Vec<String>,
    },
}

impl RenderedFeature {
    pub fn position(&self) -> Coordinate {
        match self {
            RenderedFeature::Point { position, .. } => *position,
            RenderedFeature::Cluster { position, .. } => *position,
        }
    }
}

/// Marker layer with grid clustering
pub struct MarkerLayer {
    markers: Vec<Marker>,
    cluster_radius_px: f64,
}

impl MarkerLayer {
    pub fn new(cluster_radius_px: f64) -> Self {
        Self {
            markers: Vec::new(),
            cluster_radius_px,
        }
    }

    /// Replace the marker set wholesale
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
    }

    /// Cluster the marker set at a zoom level
    pub fn render(&self, zoom: f64) -> Vec<RenderedFeature> {
        let mut cells: BTreeMap<(i64, i64), Vec<&Marker>> = BTreeMap::new();
        for marker in &self.markers {
            cells
                .entry(self.cell_key(marker.coordinates, zoom))
                .or_default()
                .push(marker);
        }

        cells
            .into_values()
            .map(|group| {
                if let [single] = group.as_slice() {
                    RenderedFeature::Point {
                        id: single.id.clone(),
                        position: single.coordinates,
                        label: single.price_label.clone(),
                    }
                } else {
                    let count = group.len();
                    let lng = group.iter().map(|m| m.coordinates.lng).sum::<f64>() / count as f64;
                    let lat = group.iter().map(|m| m.coordinates.lat).sum::<f64>() / count as f64;
                    RenderedFeature::Cluster {
                        position: Coordinate::new(lng, lat),
                        count,
                        label: abbreviate_count(count),
                        leaves: group.iter().map(|m| m.id.clone()).collect(),
                    }
                }
            })
            .collect()
    }

    /// Smallest zoom at which the given members no longer share one
    /// cluster cell
    pub fn expansion_zoom(&self, leaves: &[String], current_zoom: f64) -> f64 {
        let members: Vec<&Marker> = self
            .markers
            .iter()
            .filter(|m| leaves.contains(&m.id))
            .collect();

        if members.len() < 2 {
            return (current_zoom + 1.0).min(MAX_CLUSTER_ZOOM);
        }

        let mut zoom = current_zoom.floor() + 1.0;
        while zoom < MAX_CLUSTER_ZOOM {
            let mut keys = std::collections::BTreeSet::new();
            for member in &members {
                keys.insert(self.cell_key(member.coordinates, zoom));
            }
            if keys.len() > 1 {
                return zoom;
            }
            zoom += 1.0;
        }
        MAX_CLUSTER_ZOOM
    }

    /// Feature under a viewport pixel position, within the pick radius
    pub fn hit_test<'a>(
        features: &'a [RenderedFeature],
        camera: &Camera,
        px: f64,
        py: f64,
        pick_radius_px: f64,
    ) -> Option<&'a RenderedFeature> {
        features
            .iter()
            .filter_map(|feature| {
                let (fx, fy) = camera.lng_lat_to_screen(feature.position());
                let distance = ((fx - px).powi(2) + (fy - py).powi(2)).sqrt();
                (distance <= pick_radius_px).then_some((feature, distance))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(feature, _)| feature)
    }

    fn cell_key(&self, coordinate: Coordinate, zoom: f64) -> (i64, i64) {
        let (x, y) = project(coordinate, zoom);
        (
            (x / self.cluster_radius_px).floor() as i64,
            (y / self.cluster_radius_px).floor() as i64,
        )
    }
}

/// Abbreviate a cluster count for its label: 999 → "999", 1200 → "1.2K"
pub fn abbreviate_count(count: usize) -> String {
    fn scaled(value: f64, suffix: &str) -> String {
        let text = format!("{:.1}", value);
        let text = text.strip_suffix(".0").unwrap_or(&text);
        format!("{}{}", text, suffix)
    }

    if count < 1000 {
        count.to_string()
    } else if count < 1_000_000 {
        scaled(count as f64 / 1000.0, "K")
    } else {
        scaled(count as f64 / 1_000_000.0, "M")
    }
}
