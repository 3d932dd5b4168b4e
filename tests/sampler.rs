//! Frame sampling and end-to-end screening tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`
//! and are skipped when they are missing.

use std::{path::Path, time::Duration};

use framescreen::{
    Category, Classification, ClassifierError, FrameSampler, FrameTimestamp, OperationType,
    ProgressCallback, ProgressInfo, SafetyClassifier, ScreeningError, ScreeningOptions,
    VideoScreener, extract_frames,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn audio_only_path() -> &'static str {
    "tests/fixtures/audio_only.m4a"
}

/// Flags every upload as violent.
struct AlwaysViolent;

impl SafetyClassifier for AlwaysViolent {
    async fn classify(&self, _jpeg: &[u8]) -> Result<Classification, ClassifierError> {
        Ok(Classification::new().with_severity(Category::Violence, 4))
    }
}

#[test]
fn metadata_describes_video_stream() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let sampler = FrameSampler::open(path, 1.0).expect("Failed to open test video");
    let metadata = sampler.metadata();
    assert_eq!((metadata.width, metadata.height), (320, 240));
    assert!((metadata.frames_per_second - 30.0).abs() < 0.01);
    // Container durations may round up past the last frame.
    assert!(sampler.expected_samples().is_some_and(|samples| (5..=6).contains(&samples)));
}

#[test]
fn one_sample_per_second() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut sampler = FrameSampler::open(path, 1.0).expect("Failed to open test video");
    let timestamps: Vec<String> = sampler
        .frames()
        .expect("Failed to start decoding")
        .map(|frame| frame.expect("Failed to sample").timestamp.to_string())
        .collect();

    assert_eq!(
        timestamps,
        ["00-00-00.00", "00-00-01.00", "00-00-02.00", "00-00-03.00", "00-00-04.00"]
    );
}

#[test]
fn fractional_rates_land_on_grid_points() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut sampler = FrameSampler::open(path, 4.0).expect("Failed to open test video");
    let frames: Vec<_> = sampler
        .frames()
        .expect("Failed to start decoding")
        .collect::<Result<_, _>>()
        .expect("Failed to sample");

    assert_eq!(frames.len(), 20);
    for (index, frame) in frames.iter().enumerate() {
        assert_eq!(
            frame.timestamp,
            FrameTimestamp::new(Duration::from_millis(250 * index as u64))
        );
        assert_eq!((frame.image.width(), frame.image.height()), (320, 240));
    }
}

#[test]
fn rates_above_frame_rate_never_repeat_timestamps() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut sampler = FrameSampler::open(path, 100.0).expect("Failed to open test video");
    let timestamps: Vec<FrameTimestamp> = sampler
        .frames()
        .expect("Failed to start decoding")
        .map(|frame| frame.expect("Failed to sample").timestamp)
        .collect();

    // At most one sample per decoded frame, strictly increasing labels.
    assert!(timestamps.len() <= 150);
    assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));
    let labels: Vec<String> = timestamps.iter().map(ToString::to_string).collect();
    assert!(labels.windows(2).all(|pair| pair[0] != pair[1]));
}

#[test]
fn audio_only_file_has_no_video_stream() {
    let path = audio_only_path();
    if !Path::new(path).exists() {
        return;
    }

    let result = FrameSampler::open(path, 1.0);
    assert!(matches!(result, Err(ScreeningError::NoVideoStream)));
}

#[test]
fn extract_writes_frames_to_directory() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let written = extract_frames(path, output.path(), &ScreeningOptions::new())
        .expect("Failed to extract frames");

    assert_eq!(written.len(), 5);
    assert!(output.path().join("00-00-04.00.png").is_file());
}

#[derive(Default)]
struct StageCounter {
    sampling: std::sync::atomic::AtomicU64,
    classification: std::sync::atomic::AtomicU64,
}

impl ProgressCallback for StageCounter {
    fn on_progress(&self, info: &ProgressInfo) {
        let counter = match info.operation {
            OperationType::FrameSampling => &self.sampling,
            _ => &self.classification,
        };
        counter.fetch_max(info.current, std::sync::atomic::Ordering::SeqCst);
    }
}

#[tokio::test]
async fn screening_reports_whole_video_as_one_range() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let frames_root = tempfile::tempdir().expect("Failed to create temp dir");
    let progress = std::sync::Arc::new(StageCounter::default());
    let options = ScreeningOptions::new()
        .with_frames_root(frames_root.path())
        .with_progress(progress.clone())
        .with_batch(
            framescreen::BatchOptions::new().with_submission_interval(Duration::from_millis(1)),
        );

    let report = VideoScreener::new(AlwaysViolent, options)
        .screen(path)
        .await
        .expect("Failed to screen video");

    assert_eq!(report.frames.len(), 5);
    assert_eq!(
        report.ranges.get(Category::Violence)[0].to_string(),
        "00-00-00.00 -> 00-00-04.00: Violence"
    );
    assert_eq!(report.ranges.len(), 1);

    // The per-run frames directory is gone once screening returns.
    let leftovers = std::fs::read_dir(frames_root.path()).unwrap().count();
    assert_eq!(leftovers, 0);

    let ordering = std::sync::atomic::Ordering::SeqCst;
    assert_eq!(progress.sampling.load(ordering), 5);
    assert_eq!(progress.classification.load(ordering), 5);
}
