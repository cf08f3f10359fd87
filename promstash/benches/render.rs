//! Microbenchmarks for the write path, collection, and text rendering.
//!
//! Run with: `cargo bench -p promstash -- render`

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use promstash::memory::MemoryStore;
use promstash::registry::{MetricHandle, Registry, WriteOptions};
use promstash::render::{RenderMode, render};

/// Creates a registry with one counter and one histogram, each populated
/// with `series_count` label combinations.
fn setup_registry(series_count: u32) -> (Registry<MemoryStore>, MetricHandle, MetricHandle) {
    let mut registry = Registry::with_defaults(MemoryStore::new()).unwrap();
    let requests = registry
        .counter("requests_total", "Total requests", &["route"])
        .unwrap();
    let latency = registry
        .histogram("request_seconds", "Request latency", &["route"], None)
        .unwrap();

    for i in 0..series_count {
        let route = format!("/route/{i}");
        registry
            .inc(requests, &[route.as_str()], WriteOptions::default())
            .unwrap();
        registry
            .observe(latency, &[route.as_str()], f64::from(i) / 100.0, WriteOptions::default())
            .unwrap();
    }

    (registry, requests, latency)
}

fn bench_counter_inc(c: &mut Criterion) {
    let (registry, requests, _) = setup_registry(1);

    c.bench_function("write/counter_inc", |b| {
        b.iter(|| {
            registry
                .inc(black_box(requests), black_box(&["/route/0"]), WriteOptions::default())
                .unwrap();
        });
    });
}

fn bench_histogram_observe(c: &mut Criterion) {
    let (registry, _, latency) = setup_registry(1);

    c.bench_function("write/histogram_observe", |b| {
        b.iter(|| {
            registry
                .observe(
                    black_box(latency),
                    black_box(&["/route/0"]),
                    black_box(0.042),
                    WriteOptions::default(),
                )
                .unwrap();
        });
    });
}

fn bench_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect/series_count");

    for count in [1, 10, 100] {
        let (registry, _, _) = setup_registry(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| registry.adapter().collect(black_box(true)).unwrap());
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/series_count");

    for count in [1, 10, 100] {
        let (registry, _, _) = setup_registry(count);
        let families = registry.collect().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| render(black_box(&families), RenderMode::Strict).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_counter_inc,
    bench_histogram_observe,
    bench_collect,
    bench_render,
);
criterion_main!(benches);
