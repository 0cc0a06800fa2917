//! Workout and route loading from a health-data store.
//!
//! The store itself (HealthKit, Health Connect, ...) lives on the platform
//! side behind [`HealthDataSource`]. [`RouteLoader`] queries the workouts
//! matching a [`WorkoutQuery`], issues one route fetch per workout with
//! bounded concurrency, and returns only once every fetch has finished:
//! - Route fetches complete in any order; the collection is sorted after the join
//! - A failed route fetch is logged and kept as an empty route
//! - A failed workout query or denied authorization is returned as an error

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{HeatmapConfig, LoaderConfig};
use crate::error::{MotionMapsError, Result};
use crate::heatmap::HeatmapFrequency;
use crate::overlay::RouteOverlay;
use crate::region::MapRegion;
use crate::{GeoSample, Route};

/// Progress callback type: `(completed, total)`
pub type ProgressCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;

// ============================================================================
// Workouts
// ============================================================================

/// Kind of recorded workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ActivityType {
    Walking,
    Running,
    Cycling,
    Swimming,
    Hiking,
    Yoga,
    StrengthTraining,
    Other,
}

impl ActivityType {
    /// Title shown above a workout's map.
    pub fn name(&self) -> &'static str {
        match self {
            ActivityType::Walking => "Walking",
            ActivityType::Running => "Running",
            ActivityType::Cycling => "Cycling",
            ActivityType::Swimming => "Swimming",
            ActivityType::Hiking => "Hiking",
            ActivityType::Yoga => "Yoga",
            ActivityType::StrengthTraining => "Strength Training",
            ActivityType::Other => "Workout",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recorded workout as reported by the health store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Workout {
    pub id: String,
    pub activity_type: ActivityType,
    /// Unix timestamp (seconds)
    pub start_time: i64,
    /// Unix timestamp (seconds)
    pub end_time: i64,
}

/// Workouts of one type starting on or after a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkoutQuery {
    pub activity_type: ActivityType,
    pub since: NaiveDate,
}

impl WorkoutQuery {
    pub fn new(activity_type: ActivityType, since: NaiveDate) -> Self {
        Self {
            activity_type,
            since,
        }
    }

    /// Query from a calendar date; fails for dates that do not exist.
    pub fn starting_on(activity_type: ActivityType, year: i32, month: u32, day: u32) -> Result<Self> {
        let since = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            MotionMapsError::config(format!("invalid date {:04}-{:02}-{:02}", year, month, day))
        })?;
        Ok(Self::new(activity_type, since))
    }

    /// Midnight UTC of `since`, as a Unix timestamp.
    pub fn since_timestamp(&self) -> i64 {
        self.since.and_time(NaiveTime::MIN).and_utc().timestamp()
    }

    pub fn matches(&self, workout: &Workout) -> bool {
        workout.activity_type == self.activity_type && workout.start_time >= self.since_timestamp()
    }
}

// ============================================================================
// Health-data source
// ============================================================================

/// Platform health store.
#[async_trait]
pub trait HealthDataSource: Send + Sync {
    /// Whether the device has a health store at all.
    fn is_available(&self) -> bool;

    /// Ask for read access to workouts and their routes.
    async fn request_authorization(&self) -> Result<()>;

    /// Workouts matching the query.
    async fn fetch_workouts(&self, query: &WorkoutQuery) -> Result<Vec<Workout>>;

    /// Route samples of a workout in recording order. A workout recorded
    /// without GPS has no route series and yields an empty vector.
    async fn fetch_route(&self, workout: &Workout) -> Result<Vec<GeoSample>>;
}

// ============================================================================
// Route collections
// ============================================================================

/// Workouts with their routes, most recently finished first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteCollection {
    entries: Vec<(Workout, Route)>,
}

impl RouteCollection {
    pub fn from_entries(mut entries: Vec<(Workout, Route)>) -> Self {
        entries.sort_by(|a, b| b.0.end_time.cmp(&a.0.end_time).then_with(|| a.0.id.cmp(&b.0.id)));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, workout_id: &str) -> Option<(&Workout, &Route)> {
        self.entries
            .iter()
            .find(|(w, _)| w.id == workout_id)
            .map(|(w, r)| (w, r))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Workout, &Route)> + '_ {
        self.entries.iter().map(|(w, r)| (w, r))
    }

    pub fn workouts(&self) -> Vec<&Workout> {
        self.entries.iter().map(|(w, _)| w).collect()
    }

    pub fn routes(&self) -> Vec<&Route> {
        self.entries.iter().map(|(_, r)| r).collect()
    }

    /// Total GPS samples across all routes.
    pub fn sample_count(&self) -> usize {
        self.entries.iter().map(|(_, r)| r.len()).sum()
    }

    /// Heat map of every route in the collection.
    pub fn heatmap(&self, config: &HeatmapConfig) -> HeatmapFrequency {
        let routes = self.routes();
        #[cfg(feature = "parallel")]
        {
            crate::heatmap::aggregate_routes_parallel(&routes, config)
        }
        #[cfg(not(feature = "parallel"))]
        {
            crate::heatmap::aggregate_routes(&routes, config)
        }
    }

    /// Route overlays for the combined map (workouts without GPS skipped).
    pub fn overlays(&self) -> Vec<RouteOverlay> {
        self.entries
            .iter()
            .filter_map(|(_, r)| RouteOverlay::from_route(r))
            .collect()
    }

    pub fn heatmap_region(&self) -> MapRegion {
        MapRegion::for_heatmap(&self.routes())
    }
}

// ============================================================================
// Route loader
// ============================================================================

/// Loads workouts and all their routes from a [`HealthDataSource`].
pub struct RouteLoader<'a, S: HealthDataSource + ?Sized> {
    source: &'a S,
    config: LoaderConfig,
    on_progress: Option<ProgressCallback>,
}

impl<'a, S: HealthDataSource + ?Sized> RouteLoader<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            config: LoaderConfig::default(),
            on_progress: None,
        }
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Fetch matching workouts, then every route, and join them all.
    pub async fn load(&self, query: &WorkoutQuery) -> Result<RouteCollection> {
        let start = Instant::now();
        let workouts: Vec<Workout> = self
            .source
            .fetch_workouts(query)
            .await?
            .into_iter()
            .filter(|w| query.matches(w))
            .collect();

        let total = workouts.len() as u32;
        let concurrency = self.config.max_concurrency.max(1);
        info!(
            "[RouteLoader] Fetching {} {} routes with {} concurrent queries",
            total, query.activity_type, concurrency
        );

        let source = self.source;
        let completed = AtomicU32::new(0);
        let completed = &completed;
        let on_progress = self.on_progress.as_ref();

        let entries: Vec<(Workout, Route)> = stream::iter(workouts)
            .map(move |workout| async move {
                let samples = match source.fetch_route(&workout).await {
                    Ok(samples) => samples,
                    Err(e) => {
                        warn!(
                            "[RouteLoader] Route for {} unavailable, keeping it empty: {}",
                            workout.id, e
                        );
                        Vec::new()
                    }
                };

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(cb) = on_progress {
                    cb(done, total);
                }

                let route = Route::new(workout.id.clone(), samples);
                (workout, route)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let collection = RouteCollection::from_entries(entries);
        info!(
            "[RouteLoader] Loaded {} {} workouts ({} samples) in {:.2}s",
            collection.len(),
            query.activity_type,
            collection.sample_count(),
            start.elapsed().as_secs_f64()
        );

        Ok(collection)
    }
}

// ============================================================================
// Route library (running + cycling)
// ============================================================================

/// Running and cycling routes, the two maps the app offers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteLibrary {
    pub running: RouteCollection,
    pub cycling: RouteCollection,
}

impl RouteLibrary {
    /// Authorize, then load running and cycling workouts since `since`.
    pub async fn load<S: HealthDataSource + ?Sized>(
        source: &S,
        since: NaiveDate,
        config: LoaderConfig,
    ) -> Result<Self> {
        if !source.is_available() {
            warn!("[RouteLibrary] Health data is not available");
            return Err(MotionMapsError::HealthDataUnavailable);
        }

        source.request_authorization().await?;
        debug!("[RouteLibrary] Authorization granted");

        let loader = RouteLoader::new(source).with_config(config);
        let running_query = WorkoutQuery::new(ActivityType::Running, since);
        let cycling_query = WorkoutQuery::new(ActivityType::Cycling, since);

        let (running, cycling) =
            futures::try_join!(loader.load(&running_query), loader.load(&cycling_query))?;

        Ok(Self { running, cycling })
    }

    /// Activity types that have at least one workout, running first.
    pub fn available_activities(&self) -> Vec<ActivityType> {
        let mut available = Vec::new();
        if !self.running.is_empty() {
            available.push(ActivityType::Running);
        }
        if !self.cycling.is_empty() {
            available.push(ActivityType::Cycling);
        }
        available
    }

    pub fn collection(&self, activity_type: ActivityType) -> Option<&RouteCollection> {
        match activity_type {
            ActivityType::Running => Some(&self.running),
            ActivityType::Cycling => Some(&self.cycling),
            _ => None,
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Health store backed by in-memory workouts, for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryHealthStore {
    unavailable: bool,
    deny_authorization: bool,
    fail_workout_queries: bool,
    workouts: Vec<Workout>,
    routes: HashMap<String, Vec<GeoSample>>,
    failing_routes: HashSet<String>,
    route_queries: AtomicUsize,
}

impl InMemoryHealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a workout; an empty `samples` models a workout without GPS.
    pub fn with_workout(mut self, workout: Workout, samples: Vec<GeoSample>) -> Self {
        if !samples.is_empty() {
            self.routes.insert(workout.id.clone(), samples);
        }
        self.workouts.push(workout);
        self
    }

    /// Make the route query for a workout fail.
    pub fn with_failing_route(mut self, workout_id: impl Into<String>) -> Self {
        self.failing_routes.insert(workout_id.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn denying_authorization(mut self) -> Self {
        self.deny_authorization = true;
        self
    }

    pub fn failing_workout_queries(mut self) -> Self {
        self.fail_workout_queries = true;
        self
    }

    /// Number of `fetch_route` calls served so far.
    pub fn route_queries(&self) -> usize {
        self.route_queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl HealthDataSource for InMemoryHealthStore {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn request_authorization(&self) -> Result<()> {
        if self.deny_authorization {
            return Err(MotionMapsError::AuthorizationDenied {
                message: "read access to workouts declined".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_workouts(&self, query: &WorkoutQuery) -> Result<Vec<Workout>> {
        if self.fail_workout_queries {
            return Err(MotionMapsError::query("workout query failed"));
        }
        let mut workouts: Vec<Workout> = self
            .workouts
            .iter()
            .filter(|w| query.matches(w))
            .cloned()
            .collect();
        workouts.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        Ok(workouts)
    }

    async fn fetch_route(&self, workout: &Workout) -> Result<Vec<GeoSample>> {
        self.route_queries.fetch_add(1, Ordering::Relaxed);
        if self.failing_routes.contains(&workout.id) {
            return Err(MotionMapsError::query(format!(
                "route query for {} failed",
                workout.id
            )));
        }
        Ok(self.routes.get(&workout.id).cloned().unwrap_or_default())
    }
}
