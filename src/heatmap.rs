//! Heat map frequency aggregation.
//!
//! Buckets every GPS sample of every route into a [`GridCell`] and counts
//! how many samples fall into each. The result is a pure function of the
//! multiset of input samples: route order, grouping and (with the
//! `parallel` feature) thread scheduling do not affect it.

use std::collections::hash_map::{self, HashMap};

use log::{debug, warn};

use crate::config::{CoordinatePolicy, HeatmapConfig};
use crate::error::MotionMapsError;
use crate::grid::{GridCell, GridPrecision};
use crate::GeoSample;

/// Sample count per grid cell, accumulated across routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeatmapFrequency {
    counts: HashMap<GridCell, u32>,
}

impl HeatmapFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate routes with the given configuration.
    pub fn from_routes<R: AsRef<[GeoSample]>>(routes: &[R], config: &HeatmapConfig) -> Self {
        aggregate_routes(routes, config)
    }

    /// Count one sample against its cell. Counts saturate at `u32::MAX`.
    #[inline]
    pub fn increment(&mut self, cell: GridCell) {
        self.add(cell, 1);
    }

    #[inline]
    fn add(&mut self, cell: GridCell, count: u32) {
        let slot = self.counts.entry(cell).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    pub fn get(&self, cell: &GridCell) -> u32 {
        self.counts.get(cell).copied().unwrap_or(0)
    }

    /// Number of distinct cells.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all cell counts.
    pub fn total_samples(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }

    pub fn max_count(&self) -> u32 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// Cells in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, GridCell, u32> {
        self.counts.iter()
    }

    /// Cells ordered by descending count, then by latitude and longitude,
    /// so renderers get a stable draw order.
    pub fn sorted_cells(&self) -> Vec<(GridCell, u32)> {
        let mut cells: Vec<(GridCell, u32)> = self.counts.iter().map(|(&c, &n)| (c, n)).collect();
        cells.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        cells
    }

    /// Add another frequency map key-wise.
    pub fn merge(&mut self, other: &HeatmapFrequency) {
        for (&cell, &count) in &other.counts {
            self.add(cell, count);
        }
    }

    /// Consuming merge, folding the smaller map into the larger one.
    pub fn merged(mut self, mut other: HeatmapFrequency) -> HeatmapFrequency {
        if self.counts.len() < other.counts.len() {
            std::mem::swap(&mut self, &mut other);
        }
        for (cell, count) in other.counts {
            self.add(cell, count);
        }
        self
    }
}

impl<'a> IntoIterator for &'a HeatmapFrequency {
    type Item = (&'a GridCell, &'a u32);
    type IntoIter = hash_map::Iter<'a, GridCell, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

/// A sample that was skipped during aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSample {
    /// Index of the route in the input slice
    pub route_index: usize,
    /// Index of the sample within its route
    pub sample_index: usize,
    /// Always [`MotionMapsError::InvalidCoordinate`]
    pub reason: MotionMapsError,
}

/// Frequency map plus the bookkeeping of what was counted.
#[derive(Debug, Clone, Default)]
pub struct AggregationReport {
    pub frequency: HeatmapFrequency,
    /// Samples counted into a cell
    pub accepted: u64,
    pub rejected: Vec<RejectedSample>,
}

impl AggregationReport {
    /// Every input sample is either accepted or rejected.
    pub fn total_input(&self) -> u64 {
        self.accepted + self.rejected.len() as u64
    }
}

/// Cell for a sample under the configured policy, or the reason it has none.
#[inline]
fn cell_for(
    sample: &GeoSample,
    precision: GridPrecision,
    policy: CoordinatePolicy,
) -> Result<GridCell, MotionMapsError> {
    let invalid = || MotionMapsError::InvalidCoordinate {
        latitude: sample.latitude,
        longitude: sample.longitude,
    };
    if policy == CoordinatePolicy::Reject && !sample.is_valid() {
        return Err(invalid());
    }
    GridCell::from_sample(sample, precision).ok_or_else(invalid)
}

fn accumulate_route(
    frequency: &mut HeatmapFrequency,
    route_index: usize,
    samples: &[GeoSample],
    precision: GridPrecision,
    policy: CoordinatePolicy,
    rejected: &mut Vec<RejectedSample>,
) -> u64 {
    let mut accepted = 0;
    for (sample_index, sample) in samples.iter().enumerate() {
        match cell_for(sample, precision, policy) {
            Ok(cell) => {
                frequency.increment(cell);
                accepted += 1;
            }
            Err(reason) => {
                warn!(
                    "[heatmap] Skipping sample {} of route {}: {}",
                    sample_index, route_index, reason
                );
                rejected.push(RejectedSample {
                    route_index,
                    sample_index,
                    reason,
                });
            }
        }
    }
    accepted
}

/// Aggregate routes into a heat map, reporting skipped samples.
///
/// An invalid sample never aborts the aggregation; it is recorded in
/// [`AggregationReport::rejected`] and the rest are counted.
pub fn aggregate_routes_checked<R: AsRef<[GeoSample]>>(
    routes: &[R],
    config: &HeatmapConfig,
) -> AggregationReport {
    let precision = config.precision();
    let mut report = AggregationReport::default();

    for (route_index, route) in routes.iter().enumerate() {
        report.accepted += accumulate_route(
            &mut report.frequency,
            route_index,
            route.as_ref(),
            precision,
            config.coordinate_policy,
            &mut report.rejected,
        );
    }

    debug!(
        "[heatmap] {} routes -> {} cells ({} samples, {} rejected)",
        routes.len(),
        report.frequency.len(),
        report.accepted,
        report.rejected.len()
    );

    report
}

/// Aggregate routes into a heat map.
///
/// # Example
/// ```
/// use motion_maps::{aggregate_routes, GeoSample, GridCell, GridPrecision, HeatmapConfig};
///
/// let routes = vec![vec![
///     GeoSample::new(51.5072, 0.1276),
///     GeoSample::new(51.5072, 0.1276),
///     GeoSample::new(51.5073, 0.1276),
/// ]];
/// let frequency = aggregate_routes(&routes, &HeatmapConfig::default());
///
/// let cell = GridCell::from_coords(51.507, 0.128, GridPrecision::DEFAULT).unwrap();
/// assert_eq!(frequency.get(&cell), 3);
/// ```
pub fn aggregate_routes<R: AsRef<[GeoSample]>>(
    routes: &[R],
    config: &HeatmapConfig,
) -> HeatmapFrequency {
    aggregate_routes_checked(routes, config).frequency
}

/// Aggregate routes using parallel processing.
///
/// Each worker folds whole routes into its own frequency map; the maps are
/// then merged. Counting is commutative, so the result equals
/// [`aggregate_routes`].
#[cfg(feature = "parallel")]
pub fn aggregate_routes_parallel<R: AsRef<[GeoSample]> + Sync>(
    routes: &[R],
    config: &HeatmapConfig,
) -> HeatmapFrequency {
    use rayon::prelude::*;

    let precision = config.precision();
    let policy = config.coordinate_policy;

    let frequency = routes
        .par_iter()
        .enumerate()
        .fold(HeatmapFrequency::new, |mut acc, (route_index, route)| {
            let mut rejected = Vec::new();
            accumulate_route(
                &mut acc,
                route_index,
                route.as_ref(),
                precision,
                policy,
                &mut rejected,
            );
            acc
        })
        .reduce(HeatmapFrequency::new, HeatmapFrequency::merged);

    debug!(
        "[heatmap] {} routes -> {} cells (parallel)",
        routes.len(),
        frequency.len()
    );

    frequency
}
