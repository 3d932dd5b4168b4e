//! # framescreen
//!
//! Screen video files for unsafe content.
//!
//! `framescreen` samples still frames from a video at a fixed rate (via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)), submits each frame
//! to an image moderation service, and folds the per-category verdicts into
//! contiguous timestamp ranges, ready to be written as a report.
//!
//! ## Quick Start
//!
//! ### Screen a Video
//!
//! ```no_run
//! use framescreen::{
//!     ContentSafetyClient, ReportFormat, ScreeningOptions, ServiceCredentials, VideoScreener,
//! };
//!
//! # async fn example() -> Result<(), framescreen::ScreeningError> {
//! let credentials = ServiceCredentials::from_env()?;
//! let screener = VideoScreener::new(
//!     ContentSafetyClient::new(&credentials)?,
//!     ScreeningOptions::new().with_samples_per_second(1.0),
//! );
//!
//! let report = screener.screen("input.mp4").await?;
//! framescreen::report::save("Unsafe Ranges.txt", &report, ReportFormat::Ranges)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Aggregate Existing Verdicts
//!
//! ```
//! use std::time::Duration;
//!
//! use framescreen::{Category, Classification, FrameTimestamp, FrameVerdict, aggregate};
//!
//! let at = |seconds| FrameTimestamp::new(Duration::from_secs(seconds));
//! let hateful = Classification::new().with_severity(Category::Hate, 2);
//!
//! let ranges = aggregate(&[FrameVerdict::classified(at(1), hateful)])?;
//! assert_eq!(ranges.get(Category::Hate)[0].to_string(), "00-00-01.00: Hate");
//! # Ok::<(), framescreen::ScreeningError>(())
//! ```
//!
//! ## Features
//!
//! - **Periodic sampling**: nearest frame at or after each grid point,
//!   labeled `hh-mm-ss.ff`
//! - **Pluggable classifier**: [`SafetyClassifier`] capability with an Azure
//!   AI Content Safety implementation
//! - **Controlled batches**: paced submissions, bounded concurrency,
//!   per-request and per-batch timeouts, retries with backoff
//! - **Range aggregation**: maximal unsafe runs per category, trailing runs
//!   flushed, unavailable frames never bridged
//! - **Reports**: category ranges, frame listing, or JSON
//! - **Progress & cancellation**: callbacks and [`CancellationToken`]
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod aggregate;
pub mod batch;
pub mod category;
pub mod classifier;
pub mod config;
pub mod content_safety;
mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod frame_store;
pub mod progress;
pub mod report;
pub mod sampler;
pub mod screener;
pub mod timestamp;
mod utilities;

pub use aggregate::{Observation, UnsafeRange, UnsafeRanges, aggregate, aggregate_category};
pub use batch::{BatchExecutor, BatchOptions, PreparedFrame, RetryPolicy};
pub use category::Category;
pub use classifier::{Classification, FrameOutcome, FrameVerdict, SafetyClassifier};
pub use config::{API_KEY_VARIABLE, ENDPOINT_VARIABLE, ScreeningOptions, ServiceCredentials};
pub use content_safety::ContentSafetyClient;
pub use conversion::{MAX_UPLOAD_DIMENSION, encode_for_upload};
pub use error::{ClassifierError, ScreeningError};
pub use ffmpeg::sync_ffmpeg_log_level;
pub use frame_store::{FrameStore, StoredFrame};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use report::{ReportFormat, ScreeningReport};
pub use sampler::{FrameSampler, MAX_SAMPLES_PER_SECOND, SampledFrame, SampledFrames, VideoMetadata};
pub use screener::{VideoScreener, extract_frames, sample_frames};
pub use timestamp::FrameTimestamp;
