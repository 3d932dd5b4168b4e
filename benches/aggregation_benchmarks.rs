//! Benchmarks for range aggregation, report rendering, and frame sampling.
//!
//! Run with: cargo bench
//!
//! The sampling benchmark requires fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::{hint::black_box, path::Path, time::Duration};

use criterion::{BenchmarkId, Criterion};
use ffmpeg_next::util::log::Level as LogLevel;
use framescreen::{
    Category, Classification, FrameSampler, FrameTimestamp, FrameVerdict, aggregate,
    report::render_ranges,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

/// One verdict per second, unsafe in bursts so every category gets ranges.
fn verdicts(count: u64) -> Vec<FrameVerdict> {
    (0..count)
        .map(|second| {
            let timestamp = FrameTimestamp::new(Duration::from_secs(second));
            if second % 97 == 0 {
                return FrameVerdict::unavailable(timestamp, "timed out");
            }
            let classification: Classification = Category::ALL
                .into_iter()
                .enumerate()
                .filter(|(index, _)| (second / (index as u64 + 3)) % 2 == 0)
                .map(|(_, category)| (category, 2))
                .collect();
            FrameVerdict::classified(timestamp, classification)
        })
        .collect()
}

fn benchmark_aggregation(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("aggregate");
    for count in [60, 3_600, 36_000] {
        let input = verdicts(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &input, |bencher, input| {
            bencher.iter(|| aggregate(black_box(input)).unwrap());
        });
    }
    group.finish();
}

fn benchmark_rendering(criterion: &mut Criterion) {
    let ranges = aggregate(&verdicts(3_600)).unwrap();
    criterion.bench_function("render ranges (1 hour at 1/s)", |bencher| {
        bencher.iter(|| render_ranges(black_box(&ranges)));
    });
}

fn benchmark_sampling(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let mut group = criterion.benchmark_group("sample");
    group.sample_size(10);
    for rate in [1.0, 10.0] {
        group.bench_with_input(BenchmarkId::from_parameter(rate), &rate, |bencher, &rate| {
            bencher.iter(|| {
                let mut sampler = FrameSampler::open(SAMPLE_VIDEO, rate).unwrap();
                sampler.frames().unwrap().count()
            });
        });
    }
    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_aggregation,
    benchmark_rendering,
    benchmark_sampling,
);
criterion::criterion_main!(benches);
