//! Result shaping benchmarks: series flattening and envelope construction.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use influx_bridge::store::{Series, StatementResult};
use influx_bridge::{flatten, Envelope};
use serde_json::json;
use std::hint::black_box;
use std::time::Duration;

fn make_groups(rows: usize, series_per_group: usize) -> Vec<StatementResult> {
    let columns: Vec<String> = ["time", "host", "region", "usage", "idle"]
        .iter()
        .map(|c| (*c).to_string())
        .collect();
    let series = (0..series_per_group)
        .map(|s| {
            let values = (0..rows)
                .map(|i| {
                    vec![
                        json!(format!("2024-01-01T00:{:02}:{:02}Z", i / 60 % 60, i % 60)),
                        json!(format!("host-{s}")),
                        json!("eu-west"),
                        json!(i as f64 * 0.01),
                        json!(100 - i % 100),
                    ]
                })
                .collect();
            Series::new(columns.clone(), values)
        })
        .collect();
    vec![StatementResult::new(series)]
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    for rows in [10usize, 1_000, 10_000] {
        let groups = make_groups(rows, 4);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| flatten(black_box(groups.clone())));
        });
    }
    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_from_rows");
    for rows in [10usize, 1_000, 10_000] {
        let records = flatten(make_groups(rows, 1));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| Envelope::from_rows(Some(black_box(records.clone()))));
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_flatten, bench_envelope
}
criterion_main!(benches);
