//! Benchmarks pour la lecture des sources

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::{Path, PathBuf};

fn find_fixtures() -> Vec<PathBuf> {
    let fixtures_dir = Path::new("../fixtures");
    if !fixtures_dir.exists() {
        return vec![];
    }

    walkdir::WalkDir::new(fixtures_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| geofeed::input::is_source_path(p))
        .collect()
}

/// Séquence synthétique de `count` emprises carrées
fn synthetic_sequence(count: usize) -> String {
    let mut text = String::with_capacity(count * 220);
    for i in 0..count {
        let x = -118.5 + (i % 1000) as f64 * 0.0005;
        let y = 34.0 + (i / 1000) as f64 * 0.0005;
        let d = 0.0002;
        text.push_str(&format!(
            r#"{{"type":"Feature","properties":{{"confidence":0.93,"release":2,"capture_dates_range":"2019-2020"}},"geometry":{{"type":"Polygon","coordinates":[[[{x},{y}],[{x1},{y}],[{x1},{y1}],[{x},{y1}],[{x},{y}]]]}}}}"#,
            x = x,
            y = y,
            x1 = x + d,
            y1 = y + d,
        ));
        text.push('\n');
    }
    text
}

fn bench_read_synthetic(c: &mut Criterion) {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Cannot create temp dir ({}), skipping benchmark", e);
            return;
        }
    };

    let mut group = c.benchmark_group("read_synthetic");
    for count in [1_000usize, 10_000] {
        let path = dir.path().join(format!("buildings_{}.geojsonl", count));
        let text = synthetic_sequence(count);
        if std::fs::write(&path, &text).is_err() {
            continue;
        }

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &path, |b, path| {
            b.iter(|| {
                let batch = geofeed::read(black_box(path)).unwrap();
                black_box(batch.records.len())
            })
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let batch = geofeed::parser::seq::parse(&synthetic_sequence(10_000), "synthetic");
    let geometries: Vec<_> = batch.records.into_iter().filter_map(|r| r.geometry).collect();

    let mut group = c.benchmark_group("validate");
    group.throughput(Throughput::Elements(geometries.len() as u64));
    group.bench_function("squares_10k", |b| {
        b.iter(|| {
            let valid = geometries
                .iter()
                .filter(|g| geofeed::validate::is_valid(black_box(g)))
                .count();
            black_box(valid)
        })
    });
    group.finish();
}

fn bench_read_fixtures(c: &mut Criterion) {
    let fixtures = find_fixtures();
    if fixtures.is_empty() {
        eprintln!("No fixtures found, skipping benchmark");
        return;
    }

    let total_size: u64 = fixtures
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    let mut group = c.benchmark_group("read_fixtures");
    group.throughput(Throughput::Bytes(total_size));
    group.sample_size(10);

    group.bench_function("all_fixtures", |b| {
        b.iter(|| {
            let mut total_records = 0;
            for path in &fixtures {
                if let Ok(batch) = geofeed::read(black_box(path)) {
                    total_records += batch.records.len();
                }
            }
            black_box(total_records)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_read_synthetic, bench_validate, bench_read_fixtures);
criterion_main!(benches);
