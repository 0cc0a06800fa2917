//! Visible map regions.
//!
//! A region is a center plus a latitude/longitude span, the shape native
//! map views take. Presets mirror the views of the app: the combined and
//! heat map views open on [`HOME`], a single workout opens on its first
//! sample.

use geo::{BoundingRect, MultiPoint, Point};
use serde::{Deserialize, Serialize};

use crate::GeoSample;

/// Anonymised home location used as the default map center (London).
pub const HOME: GeoSample = GeoSample {
    latitude: 51.5072,
    longitude: 0.1276,
    timestamp: None,
};

/// Span of the home region.
pub const HOME_SPAN: f64 = 0.1;
/// Span used when first drawing combined routes or a heat map.
pub const OVERVIEW_SPAN: f64 = 0.05;
/// Span used for a single workout.
pub const ROUTE_SPAN: f64 = 0.01;

/// Smallest span produced by [`MapRegion::fitting`] (single-point input).
const MIN_FIT_SPAN: f64 = 0.005;

/// A map viewport: center and span in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MapRegion {
    pub center_lat: f64,
    pub center_lng: f64,
    pub lat_delta: f64,
    pub lng_delta: f64,
}

/// Edges of a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl MapRegion {
    pub fn new(center: GeoSample, lat_delta: f64, lng_delta: f64) -> Self {
        Self {
            center_lat: center.latitude,
            center_lng: center.longitude,
            lat_delta,
            lng_delta,
        }
    }

    /// Square span around a center.
    pub fn around(center: GeoSample, span: f64) -> Self {
        Self::new(center, span, span)
    }

    /// Home location, 0.1° span.
    pub fn home() -> Self {
        Self::around(HOME, HOME_SPAN)
    }

    /// Initial viewport of the combined routes map.
    pub fn combined_default() -> Self {
        Self::around(HOME, OVERVIEW_SPAN)
    }

    /// Viewport for a single workout, centered on its first sample.
    pub fn for_route(route: &[GeoSample]) -> Option<Self> {
        route.first().map(|first| Self::around(*first, ROUTE_SPAN))
    }

    /// Initial heat map viewport: first recorded sample, or home when no
    /// route has samples.
    pub fn for_heatmap<R: AsRef<[GeoSample]>>(routes: &[R]) -> Self {
        routes
            .iter()
            .find_map(|r| r.as_ref().first())
            .map(|first| Self::around(*first, OVERVIEW_SPAN))
            .unwrap_or_else(Self::home)
    }

    /// Smallest region containing every valid sample, with the span scaled
    /// by `padding` (1.0 = tight fit).
    pub fn fitting<R: AsRef<[GeoSample]>>(routes: &[R], padding: f64) -> Option<Self> {
        let points: MultiPoint<f64> = routes
            .iter()
            .flat_map(|r| r.as_ref().iter())
            .filter(|s| s.is_valid())
            .map(|s| Point::new(s.longitude, s.latitude))
            .collect::<Vec<_>>()
            .into();

        let rect = points.bounding_rect()?;
        let center = rect.center();
        let padding = if padding.is_finite() && padding > 0.0 {
            padding
        } else {
            1.0
        };

        Some(Self {
            center_lat: center.y,
            center_lng: center.x,
            lat_delta: (rect.height() * padding).max(MIN_FIT_SPAN),
            lng_delta: (rect.width() * padding).max(MIN_FIT_SPAN),
        })
    }

    pub fn center(&self) -> GeoSample {
        GeoSample::new(self.center_lat, self.center_lng)
    }

    pub fn bounds(&self) -> RegionBounds {
        let half_lat = self.lat_delta / 2.0;
        let half_lng = self.lng_delta / 2.0;
        RegionBounds {
            min_lat: self.center_lat - half_lat,
            max_lat: self.center_lat + half_lat,
            min_lng: self.center_lng - half_lng,
            max_lng: self.center_lng + half_lng,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        let b = self.bounds();
        latitude >= b.min_lat && latitude <= b.max_lat && longitude >= b.min_lng && longitude <= b.max_lng
    }
}
