//! Benchmarks for history append, snapshot and analytics throughput

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use roomsense::{AnalyticsConfig, BoundedHistory, Channel, ChannelAnalytics, Sample};

fn generate_test_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let light = 300.0 + (i as f64 % 50.0);
            let distance = 80.0 + (i as f64 % 7.0);
            let temperature = 20.0 + (i as f64 % 10.0) * 0.1;
            format!("{},{},{}", light, distance, temperature)
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let lines = generate_test_lines(1000);

    group.throughput(Throughput::Elements(1000));

    group.bench_function("parse_1000_lines", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(Sample::parse(line).ok());
            }
        })
    });

    group.finish();
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");
    let samples: Vec<Sample> = generate_test_lines(1000)
        .iter()
        .filter_map(|l| Sample::parse(l).ok())
        .collect();

    group.throughput(Throughput::Elements(1000));

    group.bench_function("append_1000_samples", |b| {
        b.iter(|| {
            let history = BoundedHistory::new(50).unwrap();
            for s in &samples {
                history.append(*s);
            }
            black_box(history.ticks());
        })
    });

    let history = BoundedHistory::new(50).unwrap();
    for s in &samples {
        history.append(*s);
    }

    group.bench_function("snapshot_full_ring", |b| {
        b.iter(|| black_box(history.snapshot()))
    });

    group.finish();
}

fn bench_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics");

    let history = BoundedHistory::new(100).unwrap();
    for line in generate_test_lines(100) {
        if let Ok(s) = Sample::parse(&line) {
            history.append(s);
        }
    }
    let snapshot = history.snapshot();
    let config = AnalyticsConfig::default();

    group.bench_function("all_channels_100_samples", |b| {
        b.iter(|| {
            for channel in Channel::ALL {
                black_box(ChannelAnalytics::compute(&snapshot, channel, &config));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_append, bench_analytics);
criterion_main!(benches);
