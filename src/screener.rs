//! The screening pipeline.
//!
//! [`VideoScreener`] runs one video end to end: sample frames into an
//! exclusive frames directory, prepare them for upload, classify them as a
//! single batch, remove the directory, and aggregate the verdicts into
//! unsafe ranges. Nothing is written to disk beyond the temporary frames;
//! persisting the report is left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use framescreen::{
//!     ContentSafetyClient, ReportFormat, ScreeningOptions, ServiceCredentials, VideoScreener,
//! };
//!
//! # async fn example() -> Result<(), framescreen::ScreeningError> {
//! let client = ContentSafetyClient::new(&ServiceCredentials::from_env()?)?;
//! let screener = VideoScreener::new(client, ScreeningOptions::new());
//!
//! let report = screener.screen("input.mp4").await?;
//! framescreen::report::save("Unsafe Ranges.txt", &report, ReportFormat::Ranges)?;
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    aggregate,
    batch::{BatchExecutor, PreparedFrame},
    classifier::SafetyClassifier,
    config::ScreeningOptions,
    error::ScreeningError,
    frame_store::FrameStore,
    progress::{OperationType, StageProgress},
    report::ScreeningReport,
    sampler::FrameSampler,
};

/// Screens videos with one classifier and one set of options.
pub struct VideoScreener<C> {
    classifier: Arc<C>,
    options: ScreeningOptions,
}

impl<C> Debug for VideoScreener<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoScreener")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<C: SafetyClassifier + 'static> VideoScreener<C> {
    /// Create a screener around `classifier`.
    pub fn new(classifier: C, options: ScreeningOptions) -> Self {
        Self::with_shared(Arc::new(classifier), options)
    }

    /// Create a screener around an already shared classifier.
    pub fn with_shared(classifier: Arc<C>, options: ScreeningOptions) -> Self {
        Self {
            classifier,
            options,
        }
    }

    /// The options this screener runs with.
    pub fn options(&self) -> &ScreeningOptions {
        &self.options
    }

    /// Screen one video.
    ///
    /// # Errors
    ///
    /// - [`ScreeningError::InvalidSamplingRate`] for a bad rate.
    /// - [`ScreeningError::FileOpen`] if the video is missing or unreadable;
    ///   nothing is processed in that case.
    /// - Decode, storage, batch-timeout, and cancellation errors from the
    ///   stages below.
    pub async fn screen<P: AsRef<Path>>(
        &self,
        video: P,
    ) -> Result<ScreeningReport, ScreeningError> {
        self.options.validate()?;

        let video = video.as_ref().to_path_buf();
        if !video.is_file() {
            return Err(ScreeningError::FileOpen {
                path: video,
                reason: "file does not exist".to_string(),
            });
        }

        log::info!("Screening {}", video.display());

        let (store, prepared) = {
            let video = video.clone();
            let options = self.options.clone();
            tokio::task::spawn_blocking(move || {
                let store = sample_frames(&video, &options)?;
                let prepared = prepare_uploads(&store)?;
                Ok::<_, ScreeningError>((store, prepared))
            })
            .await
            .map_err(|error| ScreeningError::TaskFailed(error.to_string()))??
        };

        let executor = BatchExecutor::new(Arc::clone(&self.classifier), self.options.batch.clone());
        let verdicts = executor
            .with_progress(Arc::clone(&self.options.progress))
            .with_cancellation(self.options.cancellation.clone())
            .run(prepared)
            .await?;

        log::debug!("Removing frames directory {}", store.path().display());
        drop(store);

        let ranges = aggregate::aggregate(&verdicts)?;

        Ok(ScreeningReport {
            video,
            samples_per_second: self.options.samples_per_second,
            ranges,
            frames: verdicts,
        })
    }
}

/// Sample `video` into a fresh [`FrameStore`].
///
/// Blocking: decodes the whole video on the calling thread.
///
/// # Errors
///
/// Fails if the video cannot be opened or decoded, a frame cannot be
/// written, or the run is cancelled.
pub fn sample_frames(
    video: &Path,
    options: &ScreeningOptions,
) -> Result<FrameStore, ScreeningError> {
    let mut sampler = FrameSampler::open(video, options.samples_per_second)?;

    let mut store = match &options.frames_root {
        Some(root) => FrameStore::create_in(root)?,
        None => FrameStore::create()?,
    };

    let mut tracker = StageProgress::new(
        Arc::clone(&options.progress),
        OperationType::FrameSampling,
        sampler.expected_samples(),
    );

    for sample in sampler.frames()? {
        if options.is_cancelled() {
            return Err(ScreeningError::Cancelled);
        }
        let sample = sample?;
        store.save(&sample)?;
        tracker.advance(Some(sample.timestamp));
    }
    tracker.finish();

    log::info!(
        "Sampled {} frames into {}",
        store.len(),
        store.path().display()
    );

    Ok(store)
}

/// Load every stored frame and encode it for upload.
///
/// # Errors
///
/// Fails if a stored frame cannot be read back or encoded.
pub fn prepare_uploads(store: &FrameStore) -> Result<Vec<PreparedFrame>, ScreeningError> {
    store
        .frames()
        .iter()
        .map(|frame| {
            Ok(PreparedFrame {
                timestamp: frame.timestamp,
                jpeg: frame.load_for_upload()?,
            })
        })
        .collect()
}

/// Sample `video` and copy the frames into `destination`.
///
/// Returns the written paths. The temporary store is removed afterwards.
///
/// # Errors
///
/// Same as [`sample_frames`], plus copy failures.
pub fn extract_frames<P: AsRef<Path>, Q: AsRef<Path>>(
    video: P,
    destination: Q,
    options: &ScreeningOptions,
) -> Result<Vec<PathBuf>, ScreeningError> {
    options.validate()?;
    let store = sample_frames(video.as_ref(), options)?;
    store.persist_to(destination)
}
