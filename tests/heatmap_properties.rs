//! Aggregation properties of the heat map over realistic route sets.
//!
//! Run with: `cargo test --test heatmap_properties`
//! (add `--features parallel` to also check the rayon path)

use motion_maps::{
    aggregate_routes, aggregate_routes_checked, heatmap_markers, GeoSample, GridCell,
    GridPrecision, HeatmapConfig, HeatmapFrequency, Route,
};

/// Deterministic pseudo-random stream so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Routes wandering around central London, some empty.
fn synthetic_routes(count: usize, seed: u64) -> Vec<Route> {
    let mut rng = Lcg(seed);
    (0..count)
        .map(|r| {
            let len = if r % 7 == 0 { 0 } else { 50 + (rng.next_f64() * 300.0) as usize };
            let mut lat = 51.49 + rng.next_f64() * 0.04;
            let mut lng = 0.10 + rng.next_f64() * 0.05;
            let samples = (0..len)
                .map(|i| {
                    lat += (rng.next_f64() - 0.5) * 0.0008;
                    lng += (rng.next_f64() - 0.5) * 0.0008;
                    GeoSample::at(lat, lng, 1_735_900_000 + i as i64)
                })
                .collect();
            Route::new(format!("workout-{}", r), samples)
        })
        .collect()
}

fn cell(lat: f64, lng: f64) -> GridCell {
    GridCell::from_coords(lat, lng, GridPrecision::DEFAULT).unwrap()
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_concrete_scenario_collapses_to_one_cell() {
    init();
    let routes = vec![vec![
        GeoSample::new(51.5072, 0.1276),
        GeoSample::new(51.5072, 0.1276),
        GeoSample::new(51.5073, 0.1276),
    ]];
    let frequency = aggregate_routes(&routes, &HeatmapConfig::default());

    assert_eq!(frequency.len(), 1);
    assert_eq!(frequency.get(&cell(51.507, 0.128)), 3);
}

#[test]
fn test_quantization_boundary() {
    // Latitude products fall below the .5 mark (51507), longitude
    // products at or above it (128)
    let routes = vec![vec![GeoSample::new(51.50715, 0.12765), GeoSample::new(51.50724, 0.12755)]];
    let frequency = aggregate_routes(&routes, &HeatmapConfig::default());

    assert_eq!(frequency.len(), 1);
    let (only, count) = frequency.sorted_cells()[0];
    assert_eq!(count, 2);
    assert_eq!(only.latitude(), 51.507);
    assert_eq!(only.longitude(), 0.128);
}

#[test]
fn test_exact_ties_round_half_away_from_zero() {
    let routes = vec![vec![
        GeoSample::new(51.5065, 0.0025),
        GeoSample::new(-33.8675, -0.0025),
    ]];
    let frequency = aggregate_routes(&routes, &HeatmapConfig::default());

    assert_eq!(frequency.get(&cell(51.507, 0.003)), 1);
    assert_eq!(frequency.get(&cell(-33.868, -0.003)), 1);
    // Half-to-even would have produced these instead
    assert_eq!(frequency.get(&cell(51.506, 0.002)), 0);
}

#[test]
fn test_empty_input() {
    let none: Vec<Route> = vec![];
    assert!(aggregate_routes(&none, &HeatmapConfig::default()).is_empty());

    let only_empty = vec![Route::empty("a"), Route::empty("b")];
    assert!(aggregate_routes(&only_empty, &HeatmapConfig::default()).is_empty());
}

#[test]
fn test_count_conservation() {
    init();
    let routes = synthetic_routes(40, 7);
    let expected: usize = routes.iter().map(|r| r.len()).sum();

    let report = aggregate_routes_checked(&routes, &HeatmapConfig::default());
    assert!(report.rejected.is_empty());
    assert_eq!(report.accepted, expected as u64);
    assert_eq!(report.frequency.total_samples(), expected as u64);
}

#[test]
fn test_determinism_under_reordering_and_regrouping() {
    let config = HeatmapConfig::default();
    let routes = synthetic_routes(30, 42);
    let baseline = aggregate_routes(&routes, &config);

    // Same routes, reversed order
    let mut reversed = routes.clone();
    reversed.reverse();
    assert_eq!(aggregate_routes(&reversed, &config), baseline);

    // Same samples, regrouped into one flat route
    let flat: Vec<GeoSample> = routes.iter().flat_map(|r| r.samples.iter().copied()).collect();
    assert_eq!(aggregate_routes(&[flat], &config), baseline);

    // Repeated invocation
    assert_eq!(aggregate_routes(&routes, &config), baseline);
}

#[test]
fn test_merge_associativity() {
    let config = HeatmapConfig::default();
    let routes = synthetic_routes(12, 99);
    let (a, b) = routes.split_at(5);

    let together = aggregate_routes(&routes, &config);

    let mut merged = aggregate_routes(a, &config);
    merged.merge(&aggregate_routes(b, &config));
    assert_eq!(merged, together);

    let mut per_route = HeatmapFrequency::new();
    for route in routes.iter().rev() {
        per_route.merge(&HeatmapFrequency::from_routes(std::slice::from_ref(route), &config));
    }
    assert_eq!(per_route, together);
}

#[test]
fn test_invalid_samples_do_not_abort() {
    let mut routes = synthetic_routes(5, 3);
    let valid: usize = routes.iter().map(|r| r.len()).sum();
    routes[1].samples.push(GeoSample::new(f64::NAN, 0.1));
    routes[2].samples.insert(0, GeoSample::new(12.0, 540.0));

    let report = aggregate_routes_checked(&routes, &HeatmapConfig::default());
    assert_eq!(report.rejected.len(), 2);
    assert_eq!(report.accepted, valid as u64);
    assert_eq!(report.total_input(), valid as u64 + 2);
}

#[test]
fn test_markers_saturate_at_cap() {
    let config = HeatmapConfig::default();
    let routes = vec![
        vec![GeoSample::new(51.5072, 0.1276); 15],
        vec![GeoSample::new(51.6000, 0.2000); 5],
    ];
    let markers = heatmap_markers(&aggregate_routes(&routes, &config), &config);

    assert_eq!(markers.len(), 2);
    assert_eq!((markers[0].count, markers[0].opacity), (15, 1.0));
    assert_eq!((markers[1].count, markers[1].opacity), (5, 0.5));
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_aggregation_matches() {
    let config = HeatmapConfig::default();
    let routes = synthetic_routes(200, 11);
    assert_eq!(
        motion_maps::aggregate_routes_parallel(&routes, &config),
        aggregate_routes(&routes, &config)
    );
}
