use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;
use wayfarer::geolocation::geodesy::{distance_km, path_length_km};
use wayfarer::geolocation::Coordinate;
use wayfarer::ui::track::projection::global_pixel;

fn sample_path(points: usize) -> Vec<Coordinate> {
    // a walk heading roughly north-east across Puget Sound
    (0..points)
        .map(|i| Coordinate::new(47.6 + i as f64 * 0.0001, -122.5 + i as f64 * 0.0001))
        .collect()
}

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("geodesy");

    let here = Coordinate::new(47.6062, -122.3321);
    let landmark = Coordinate::new(47.624851, -122.52099);

    group.bench_function("distance_km", |b| {
        b.iter(|| black_box(distance_km(black_box(here), black_box(landmark))));
    });

    let path = sample_path(1000);
    group.bench_function("path_length_km_1000_points", |b| {
        b.iter(|| black_box(path_length_km(black_box(&path))));
    });

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    let path = sample_path(1000);
    group.bench_function("global_pixel_1000_points", |b| {
        b.iter(|| {
            for coord in &path {
                black_box(global_pixel(black_box(*coord), 13));
            }
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_distance, bench_projection
}
criterion_main!(benches);
