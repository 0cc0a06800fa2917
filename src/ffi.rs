//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the heat map and
//! route overlay builders to Swift and Kotlin. The platform health store is
//! plugged in through the [`HealthStoreCallback`] callback interface.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};

use crate::{
    aggregate_routes_checked, combined_route_overlays, heatmap_markers, init_logging,
    ActivityType, GeoSample, HealthDataSource, HeatmapConfig, HeatmapIndex, HeatmapMarker,
    LoaderConfig, MapRegion, MotionMapsError, Result, Route, RouteCollection, RouteLibrary,
    RouteOverlay, Workout, WorkoutQuery,
};

// ============================================================================
// Health store callback (implemented in Swift/Kotlin)
// ============================================================================

/// Platform health store, implemented on the mobile side.
/// Calls may block; they run on a Rust worker thread.
#[uniffi::export(callback_interface)]
pub trait HealthStoreCallback: Send + Sync {
    fn is_available(&self) -> bool;
    /// Returns false when the user declined access.
    fn request_authorization(&self) -> bool;
    /// Workouts of `activity_type` starting at or after `since_timestamp` (Unix seconds).
    fn fetch_workouts(&self, activity_type: ActivityType, since_timestamp: i64) -> Vec<Workout>;
    /// Route samples of a workout; empty when it has no route.
    fn fetch_route(&self, workout_id: String) -> Vec<GeoSample>;
}

struct CallbackHealthSource {
    store: Arc<dyn HealthStoreCallback>,
}

impl CallbackHealthSource {
    /// Run a blocking store call on tokio's blocking pool so that
    /// concurrent route fetches really overlap.
    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn HealthStoreCallback) -> T + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| MotionMapsError::Internal {
                message: format!("health store call failed: {}", e),
            })
    }
}

#[async_trait]
impl HealthDataSource for CallbackHealthSource {
    fn is_available(&self) -> bool {
        self.store.is_available()
    }

    async fn request_authorization(&self) -> Result<()> {
        if self.call(|store| store.request_authorization()).await? {
            Ok(())
        } else {
            Err(MotionMapsError::AuthorizationDenied {
                message: "declined by user".to_string(),
            })
        }
    }

    async fn fetch_workouts(&self, query: &WorkoutQuery) -> Result<Vec<Workout>> {
        let activity_type = query.activity_type;
        let since = query.since_timestamp();
        self.call(move |store| store.fetch_workouts(activity_type, since))
            .await
    }

    async fn fetch_route(&self, workout: &Workout) -> Result<Vec<GeoSample>> {
        let workout_id = workout.id.clone();
        self.call(move |store| store.fetch_route(workout_id)).await
    }
}

// ============================================================================
// Route library
// ============================================================================

/// A workout with its route, flattened for FFI.
#[derive(Debug, Clone, uniffi::Record)]
pub struct WorkoutRoute {
    pub workout: Workout,
    pub route: Route,
}

/// Running and cycling routes plus the activity list to show.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRouteLibrary {
    pub running: Vec<WorkoutRoute>,
    pub cycling: Vec<WorkoutRoute>,
    pub available_activities: Vec<ActivityType>,
}

fn flatten(collection: &RouteCollection) -> Vec<WorkoutRoute> {
    collection
        .iter()
        .map(|(workout, route)| WorkoutRoute {
            workout: workout.clone(),
            route: route.clone(),
        })
        .collect()
}

/// Authorize and load all running and cycling routes since the given day.
#[uniffi::export]
pub fn ffi_load_route_library(
    store: Box<dyn HealthStoreCallback>,
    year: i32,
    month: u32,
    day: u32,
    max_concurrency: u32,
) -> Result<FfiRouteLibrary> {
    init_logging();
    use tokio::runtime::Runtime;

    let since = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        MotionMapsError::InvalidConfig {
            message: format!("invalid date {:04}-{:02}-{:02}", year, month, day),
        }
    })?;

    let rt = Runtime::new().map_err(|e| {
        warn!("Failed to create tokio runtime: {}", e);
        MotionMapsError::Internal {
            message: format!("Runtime error: {}", e),
        }
    })?;

    let source = CallbackHealthSource {
        store: Arc::from(store),
    };
    let config = LoaderConfig {
        max_concurrency: max_concurrency.max(1) as usize,
    };
    let library = rt.block_on(RouteLibrary::load(&source, since, config))?;

    info!(
        "[MotionMapsRust] Loaded {} running and {} cycling workouts",
        library.running.len(),
        library.cycling.len()
    );

    Ok(FfiRouteLibrary {
        running: flatten(&library.running),
        cycling: flatten(&library.cycling),
        available_activities: library.available_activities(),
    })
}

// ============================================================================
// Heat map
// ============================================================================

#[uniffi::export]
pub fn ffi_default_heatmap_config() -> HeatmapConfig {
    HeatmapConfig::default()
}

#[uniffi::export]
pub fn ffi_heatmap_config_from_json(json: String) -> Result<HeatmapConfig> {
    HeatmapConfig::from_json(&json)
}

/// Heat map markers for every cell, densest first.
#[uniffi::export]
pub fn ffi_heatmap_markers(routes: Vec<Route>, config: HeatmapConfig) -> Result<Vec<HeatmapMarker>> {
    init_logging();
    config.validate()?;
    let report = aggregate_routes_checked(&routes, &config);
    info!(
        "[MotionMapsRust] heatmap: {} routes -> {} cells ({} rejected samples)",
        routes.len(),
        report.frequency.len(),
        report.rejected.len()
    );
    Ok(heatmap_markers(&report.frequency, &config))
}

/// Heat map markers inside the visible region only.
#[uniffi::export]
pub fn ffi_heatmap_markers_in_region(
    routes: Vec<Route>,
    config: HeatmapConfig,
    region: MapRegion,
) -> Result<Vec<HeatmapMarker>> {
    init_logging();
    config.validate()?;
    let frequency = aggregate_routes_checked(&routes, &config).frequency;
    Ok(HeatmapIndex::from_frequency(&frequency, &config).markers_in(&region))
}

// ============================================================================
// Routes and regions
// ============================================================================

/// Overlays for the combined routes map, optionally simplified.
#[uniffi::export]
pub fn ffi_route_overlays(routes: Vec<Route>, simplify_tolerance: Option<f64>) -> Vec<RouteOverlay> {
    init_logging();
    let overlays = combined_route_overlays(&routes);
    match simplify_tolerance {
        Some(tolerance) if tolerance > 0.0 => {
            overlays.iter().map(|o| o.simplified(tolerance)).collect()
        }
        _ => overlays,
    }
}

#[uniffi::export]
pub fn ffi_home_region() -> MapRegion {
    MapRegion::home()
}

#[uniffi::export]
pub fn ffi_region_for_route(route: Route) -> Option<MapRegion> {
    MapRegion::for_route(&route.samples)
}

#[uniffi::export]
pub fn ffi_region_for_heatmap(routes: Vec<Route>) -> MapRegion {
    MapRegion::for_heatmap(&routes)
}

#[uniffi::export]
pub fn ffi_activity_name(activity_type: ActivityType) -> String {
    activity_type.name().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    // 2025-01-03T00:00:00Z
    const JAN_3_2025: i64 = 1_735_862_400;
    const ROUTE_DELAY: Duration = Duration::from_millis(200);

    /// Store whose route queries block like a real health store.
    struct SlowStore {
        runs: usize,
    }

    impl HealthStoreCallback for SlowStore {
        fn is_available(&self) -> bool {
            true
        }

        fn request_authorization(&self) -> bool {
            true
        }

        fn fetch_workouts(&self, activity_type: ActivityType, since_timestamp: i64) -> Vec<Workout> {
            if activity_type != ActivityType::Running {
                return Vec::new();
            }
            (0..self.runs as i64)
                .map(|i| Workout {
                    id: format!("run-{}", i),
                    activity_type,
                    start_time: since_timestamp + 3600 * (i + 1),
                    end_time: since_timestamp + 3600 * (i + 2),
                })
                .collect()
        }

        fn fetch_route(&self, _workout_id: String) -> Vec<GeoSample> {
            std::thread::sleep(ROUTE_DELAY);
            vec![GeoSample::new(51.5072, 0.1276)]
        }
    }

    fn load(max_concurrency: u32) -> (FfiRouteLibrary, Duration) {
        let start = Instant::now();
        let library =
            ffi_load_route_library(Box::new(SlowStore { runs: 4 }), 2025, 1, 3, max_concurrency)
                .unwrap();
        (library, start.elapsed())
    }

    #[test]
    fn test_route_fetches_overlap_up_to_max_concurrency() {
        let (library, parallel) = load(4);
        assert_eq!(library.running.len(), 4);
        assert_eq!(library.available_activities, vec![ActivityType::Running]);
        assert!(library.running[0].workout.start_time > JAN_3_2025);
        // Four 200 ms fetches in flight together
        assert!(parallel < ROUTE_DELAY * 3, "took {:?}", parallel);

        let (_, serial) = load(1);
        assert!(serial >= ROUTE_DELAY * 4, "took {:?}", serial);
    }

    #[test]
    fn test_invalid_date_rejected() {
        let result = ffi_load_route_library(Box::new(SlowStore { runs: 0 }), 2025, 2, 30, 4);
        assert!(matches!(result, Err(MotionMapsError::InvalidConfig { .. })));
    }

    #[test]
    fn test_marker_exports_validate_config() {
        let routes = vec![Route::new("w1", vec![GeoSample::new(51.5072, 0.1276)])];
        let bad = HeatmapConfig {
            grid_precision_decimal_places: 12,
            marker_radius_meters: -5.0,
            ..HeatmapConfig::default()
        };
        assert!(matches!(
            ffi_heatmap_markers(routes.clone(), bad.clone()),
            Err(MotionMapsError::InvalidConfig { .. })
        ));
        assert!(matches!(
            ffi_heatmap_markers_in_region(routes.clone(), bad, MapRegion::home()),
            Err(MotionMapsError::InvalidConfig { .. })
        ));

        let markers = ffi_heatmap_markers(routes, ffi_default_heatmap_config()).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].radius_meters, 20.0);
    }
}
