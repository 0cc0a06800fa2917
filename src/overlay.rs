//! Overlays handed to the native map renderer.
//!
//! Everything here is plain data: the renderer draws a circle per
//! [`HeatmapMarker`] and a polyline with start/end pins per
//! [`RouteOverlay`]. Colors and stroke widths stay on the platform side.

use geo::{algorithm::simplify::Simplify, Coord, Distance, Haversine, LineString, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::config::HeatmapConfig;
use crate::grid::{GridCell, GridPrecision};
use crate::heatmap::HeatmapFrequency;
use crate::region::MapRegion;
use crate::{GeoSample, Route};

/// Linear opacity ramp: 0 samples transparent, `cap` samples or more opaque.
///
/// ```
/// use motion_maps::opacity_for_count;
/// assert_eq!(opacity_for_count(3, 10), 0.3);
/// assert_eq!(opacity_for_count(25, 10), 1.0);
/// ```
pub fn opacity_for_count(count: u32, cap: u32) -> f64 {
    if cap == 0 {
        return if count > 0 { 1.0 } else { 0.0 };
    }
    (count as f64 / cap as f64).min(1.0)
}

/// One heat map cell, ready to draw as a filled circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HeatmapMarker {
    /// Cell center (rounded latitude)
    pub latitude: f64,
    /// Cell center (rounded longitude)
    pub longitude: f64,
    /// Samples in the cell
    pub count: u32,
    /// Fill alpha in [0, 1]
    pub opacity: f64,
    pub radius_meters: f64,
}

impl HeatmapMarker {
    pub fn from_cell(cell: &GridCell, count: u32, config: &HeatmapConfig) -> Self {
        Self {
            latitude: cell.latitude(),
            longitude: cell.longitude(),
            count,
            opacity: opacity_for_count(count, config.opacity_count_cap),
            radius_meters: config.marker_radius_meters,
        }
    }
}

/// Markers for every cell, densest first.
pub fn heatmap_markers(frequency: &HeatmapFrequency, config: &HeatmapConfig) -> Vec<HeatmapMarker> {
    frequency
        .sorted_cells()
        .iter()
        .map(|(cell, count)| HeatmapMarker::from_cell(cell, *count, config))
        .collect()
}

/// Approximate (north-south, east-west) extent of a cell in meters.
pub fn cell_footprint_meters(cell: &GridCell) -> (f64, f64) {
    let half = cell.precision().cell_size_degrees() / 2.0;
    let (lat, lng) = (cell.latitude(), cell.longitude());

    let north_south = Haversine::distance(Point::new(lng, lat - half), Point::new(lng, lat + half));
    let east_west = Haversine::distance(Point::new(lng - half, lat), Point::new(lng + half, lat));

    (north_south, east_west)
}

// ============================================================================
// Spatial index over markers
// ============================================================================

/// A marker plus its position in draw order.
#[derive(Debug, Clone)]
struct IndexedMarker {
    rank: usize,
    marker: HeatmapMarker,
}

impl RTreeObject for IndexedMarker {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.marker.longitude, self.marker.latitude])
    }
}

/// R-tree over heat map markers for viewport and tap queries.
pub struct HeatmapIndex {
    tree: RTree<IndexedMarker>,
    precision: GridPrecision,
}

impl HeatmapIndex {
    /// Index markers given in draw order; queries return them in that order.
    pub fn new(markers: Vec<HeatmapMarker>, precision: GridPrecision) -> Self {
        let indexed = markers
            .into_iter()
            .enumerate()
            .map(|(rank, marker)| IndexedMarker { rank, marker })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
            precision,
        }
    }

    pub fn from_frequency(frequency: &HeatmapFrequency, config: &HeatmapConfig) -> Self {
        Self::new(heatmap_markers(frequency, config), config.precision())
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Markers whose center lies inside the region, in draw order
    /// (densest first for [`HeatmapIndex::from_frequency`]).
    pub fn markers_in(&self, region: &MapRegion) -> Vec<HeatmapMarker> {
        let b = region.bounds();
        let envelope = AABB::from_corners([b.min_lng, b.min_lat], [b.max_lng, b.max_lat]);
        let mut hits: Vec<&IndexedMarker> = self.tree.locate_in_envelope(&envelope).collect();
        hits.sort_unstable_by_key(|m| m.rank);
        hits.into_iter().map(|m| m.marker.clone()).collect()
    }

    /// Marker of the cell containing a tapped location.
    pub fn marker_at(&self, latitude: f64, longitude: f64) -> Option<&HeatmapMarker> {
        let cell = GridCell::from_coords(latitude, longitude, self.precision)?;
        let point = AABB::from_point([cell.longitude(), cell.latitude()]);
        self.tree.locate_in_envelope(&point).next().map(|m| &m.marker)
    }
}

// ============================================================================
// Route overlays
// ============================================================================

/// A workout path with its start and end pins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteOverlay {
    pub workout_id: String,
    pub path: Vec<GeoSample>,
    pub start: GeoSample,
    pub end: GeoSample,
}

impl RouteOverlay {
    /// Overlay for a route; `None` for a workout without GPS.
    pub fn from_route(route: &Route) -> Option<Self> {
        let start = *route.first()?;
        let end = *route.last()?;
        Some(Self {
            workout_id: route.workout_id.clone(),
            path: route.samples.clone(),
            start,
            end,
        })
    }

    /// Douglas-Peucker simplified copy for drawing many routes at once.
    /// Start and end pins are kept; invalid samples are dropped from the path.
    pub fn simplified(&self, tolerance_degrees: f64) -> Self {
        let line: LineString<f64> = self
            .path
            .iter()
            .filter(|s| s.is_valid())
            .map(|s| Coord {
                x: s.longitude,
                y: s.latitude,
            })
            .collect();

        let path = line
            .simplify(&tolerance_degrees)
            .0
            .into_iter()
            .map(|c| GeoSample::new(c.y, c.x))
            .collect();

        Self {
            workout_id: self.workout_id.clone(),
            path,
            start: self.start,
            end: self.end,
        }
    }
}

/// One overlay per route that has samples.
pub fn combined_route_overlays(routes: &[Route]) -> Vec<RouteOverlay> {
    routes.iter().filter_map(RouteOverlay::from_route).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate_routes;

    fn s(lat: f64, lng: f64) -> GeoSample {
        GeoSample::new(lat, lng)
    }

    #[test]
    fn test_opacity_ramp() {
        assert_eq!(opacity_for_count(0, 10), 0.0);
        assert_eq!(opacity_for_count(1, 10), 0.1);
        assert_eq!(opacity_for_count(10, 10), 1.0);
        assert_eq!(opacity_for_count(11, 10), 1.0);
        assert_eq!(opacity_for_count(0, 0), 0.0);
        assert_eq!(opacity_for_count(4, 0), 1.0);
    }

    #[test]
    fn test_markers_carry_typed_weight() {
        let mut route = vec![s(51.5072, 0.1276); 12];
        route.push(s(51.5090, 0.1300));
        let config = HeatmapConfig::default();
        let markers = heatmap_markers(&aggregate_routes(&[route], &config), &config);

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].latitude, 51.507);
        assert_eq!(markers[0].longitude, 0.128);
        assert_eq!(markers[0].count, 12);
        assert_eq!(markers[0].opacity, 1.0);
        assert_eq!(markers[0].radius_meters, 20.0);
        assert_eq!(markers[1].count, 1);
        assert_eq!(markers[1].opacity, 0.1);
    }

    #[test]
    fn test_cell_footprint() {
        let cell = GridCell::from_coords(51.507, 0.128, GridPrecision::DEFAULT).unwrap();
        let (ns, ew) = cell_footprint_meters(&cell);
        assert!(ns > 110.0 && ns < 112.5, "north-south {}", ns);
        assert!(ew > 68.0 && ew < 70.5, "east-west {}", ew);

        let equator = GridCell::from_coords(0.0, 0.0, GridPrecision::DEFAULT).unwrap();
        let (ns, ew) = cell_footprint_meters(&equator);
        assert!((ns - ew).abs() < 0.01);
    }

    #[test]
    fn test_index_viewport_and_tap() {
        let routes = vec![vec![
            s(51.5072, 0.1276),
            s(51.5072, 0.1276),
            s(51.5300, 0.1500),
            s(40.7128, -74.0060),
        ]];
        let config = HeatmapConfig::default();
        let index = HeatmapIndex::from_frequency(&aggregate_routes(&routes, &config), &config);
        assert_eq!(index.len(), 3);

        let london = index.markers_in(&MapRegion::home());
        assert_eq!(london.len(), 2);
        assert_eq!(london[0].count, 2);

        // Same order as the full marker list
        let everywhere = MapRegion::new(GeoSample::new(45.0, -37.0), 40.0, 120.0);
        let all = heatmap_markers(&aggregate_routes(&routes, &config), &config);
        assert_eq!(index.markers_in(&everywhere), all);

        let tapped = index.marker_at(51.50735, 0.12810).unwrap();
        assert_eq!(tapped.count, 2);
        assert!(index.marker_at(10.0, 10.0).is_none());
        assert!(index.marker_at(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_route_overlay_pins() {
        let route = Route::new("w1", vec![s(51.50, 0.10), s(51.51, 0.11), s(51.52, 0.12)]);
        let overlay = RouteOverlay::from_route(&route).unwrap();
        assert_eq!(overlay.start, s(51.50, 0.10));
        assert_eq!(overlay.end, s(51.52, 0.12));
        assert_eq!(overlay.path.len(), 3);

        let overlays = combined_route_overlays(&[route, Route::empty("w2")]);
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].workout_id, "w1");
    }

    #[test]
    fn test_simplified_drops_collinear_points() {
        let samples: Vec<GeoSample> = (0..50).map(|i| s(51.50 + i as f64 * 0.0001, 0.10)).collect();
        let overlay = RouteOverlay::from_route(&Route::new("w1", samples)).unwrap();
        let simple = overlay.simplified(0.00001);
        assert_eq!(simple.path.len(), 2);
        assert_eq!(simple.start, overlay.start);
        assert_eq!(simple.end, overlay.end);
    }
}
