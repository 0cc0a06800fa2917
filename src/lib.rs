//! # Motion Maps
//!
//! Workout route overlays and GPS density heat maps for mobile map views.
//!
//! This library provides:
//! - Quantization of GPS samples into fixed-precision grid cells
//! - Heat map frequency aggregation across many recorded workouts
//! - Strongly typed overlays (heat map markers, route paths, map regions)
//!   for a native mapping SDK to draw
//! - Concurrent route loading from a health-data store
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel heat map aggregation with rayon
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use motion_maps::{aggregate_routes, heatmap_markers, GeoSample, HeatmapConfig};
//!
//! let route = vec![
//!     GeoSample::new(51.5072, 0.1276),
//!     GeoSample::new(51.5072, 0.1276),
//!     GeoSample::new(51.5073, 0.1276),
//! ];
//!
//! let config = HeatmapConfig::default();
//! let frequency = aggregate_routes(&[route], &config);
//! assert_eq!(frequency.len(), 1);
//! assert_eq!(frequency.total_samples(), 3);
//!
//! for marker in heatmap_markers(&frequency, &config) {
//!     println!("{:.3},{:.3} x{} @ {:.1}", marker.latitude, marker.longitude, marker.count, marker.opacity);
//! }
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{MotionMapsError, Result};

// Heat map configuration
pub mod config;
pub use config::{CoordinatePolicy, HeatmapConfig, LoaderConfig};

// Grid quantization (GPS sample -> grid cell)
pub mod grid;
pub use grid::{GridCell, GridPrecision};

// Spatial aggregation into cell frequencies
pub mod heatmap;
#[cfg(feature = "parallel")]
pub use heatmap::aggregate_routes_parallel;
pub use heatmap::{
    aggregate_routes, aggregate_routes_checked, AggregationReport, HeatmapFrequency,
    RejectedSample,
};

// Visible map regions
pub mod region;
pub use region::{MapRegion, HOME};

// Typed overlays handed to the map renderer
pub mod overlay;
pub use overlay::{
    cell_footprint_meters, combined_route_overlays, heatmap_markers, opacity_for_count,
    HeatmapIndex, HeatmapMarker, RouteOverlay,
};

// Health-data collaborator and concurrent route loading
pub mod health;
pub use health::{
    ActivityType, HealthDataSource, InMemoryHealthStore, ProgressCallback, RouteCollection,
    RouteLibrary, RouteLoader, Workout, WorkoutQuery,
};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android
#[cfg(target_os = "android")]
pub fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("MotionMapsRust"),
    );
}

/// Initialize logging for iOS (unified logging system)
#[cfg(target_os = "ios")]
pub fn init_logging() {
    use log::LevelFilter;
    use std::sync::Once;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Fails only if another logger is already installed
        let _ = oslog::OsLogger::new("com.motionmaps.core")
            .level_filter(LevelFilter::Debug)
            .init();
    });
}

#[cfg(not(any(target_os = "android", target_os = "ios")))]
pub fn init_logging() {
    // No-op on desktop; hosts install their own logger (e.g. env_logger)
}

// ============================================================================
// Core Types
// ============================================================================

/// A single GPS observation from a recorded workout.
///
/// # Example
/// ```
/// use motion_maps::GeoSample;
/// let sample = GeoSample::new(51.5072, 0.1276); // London
/// assert!(sample.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix timestamp (seconds); carried through, not used for aggregation
    pub timestamp: Option<i64>,
}

impl GeoSample {
    /// Create a sample without a timestamp.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: None,
        }
    }

    /// Create a sample recorded at the given Unix time.
    pub fn at(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: Some(timestamp),
        }
    }

    /// Check if the sample has valid WGS-84 coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// `[latitude, longitude]` pair, the shape map renderers consume.
    pub fn lat_lng(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// One recorded workout's path, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Route {
    /// Health-store identifier of the workout this route belongs to
    pub workout_id: String,
    pub samples: Vec<GeoSample>,
}

impl Route {
    pub fn new(workout_id: impl Into<String>, samples: Vec<GeoSample>) -> Self {
        Self {
            workout_id: workout_id.into(),
            samples,
        }
    }

    /// A workout recorded without GPS.
    pub fn empty(workout_id: impl Into<String>) -> Self {
        Self::new(workout_id, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&GeoSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&GeoSample> {
        self.samples.last()
    }
}

impl AsRef<[GeoSample]> for Route {
    fn as_ref(&self) -> &[GeoSample] {
        &self.samples
    }
}

// ============================================================================
// Tests
// ============================================================================
