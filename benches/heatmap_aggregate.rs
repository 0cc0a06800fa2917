//! Heat map aggregation throughput.
//!
//! Run with: `cargo bench --bench heatmap_aggregate`
//! (add `--features parallel` to include the rayon variant)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use motion_maps::{aggregate_routes, heatmap_markers, GeoSample, HeatmapConfig};

/// `count` routes of `len` samples spiralling out from central London.
fn routes(count: usize, len: usize) -> Vec<Vec<GeoSample>> {
    (0..count)
        .map(|r| {
            let phase = r as f64 * 0.37;
            (0..len)
                .map(|i| {
                    let t = i as f64 * 0.01 + phase;
                    let radius = 0.0002 * i as f64;
                    GeoSample::new(51.5072 + radius * t.sin(), 0.1276 + radius * t.cos())
                })
                .collect()
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let config = HeatmapConfig::default();
    let mut group = c.benchmark_group("aggregate_routes");

    for &count in &[10usize, 100, 500] {
        let input = routes(count, 1_000);
        group.bench_with_input(BenchmarkId::new("sequential", count), &input, |b, input| {
            b.iter(|| aggregate_routes(black_box(input), &config))
        });

        #[cfg(feature = "parallel")]
        group.bench_with_input(BenchmarkId::new("parallel", count), &input, |b, input| {
            b.iter(|| motion_maps::aggregate_routes_parallel(black_box(input), &config))
        });
    }

    group.finish();
}

fn bench_markers(c: &mut Criterion) {
    let config = HeatmapConfig::default();
    let frequency = aggregate_routes(&routes(100, 1_000), &config);
    c.bench_function("heatmap_markers", |b| {
        b.iter(|| heatmap_markers(black_box(&frequency), &config))
    });
}

criterion_group!(benches, bench_aggregate, bench_markers);
criterion_main!(benches);
