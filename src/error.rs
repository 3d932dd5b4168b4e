//! Error types for the `framescreen` crate.
//!
//! [`ScreeningError`] is returned by every fallible pipeline operation.
//! [`ClassifierError`] is the narrower error a
//! [`SafetyClassifier`](crate::SafetyClassifier) reports for one frame; it
//! distinguishes transient failures (worth retrying) from permanent ones.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::timestamp::FrameTimestamp;

/// The unified error type for all `framescreen` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScreeningError {
    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::FrameSampler::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while storing or encoding a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The sampling rate is not a finite value in `(0, 100]`.
    #[error("Invalid sampling rate {0}: samples per second must be in (0, 100]")]
    InvalidSamplingRate(f64),

    /// A required environment variable is unset or empty.
    #[error("Missing configuration: environment variable {variable} is not set")]
    MissingConfiguration {
        /// Name of the environment variable.
        variable: &'static str,
    },

    /// A configuration value is present but unusable.
    #[error("Invalid configuration for {name}: {reason}")]
    InvalidConfiguration {
        /// Name of the setting.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Observations were not supplied in strictly increasing timestamp order.
    #[error("Timestamps out of order: {current} does not follow {previous}")]
    UnorderedTimestamps {
        /// Timestamp of the preceding observation.
        previous: FrameTimestamp,
        /// Timestamp that failed to advance.
        current: FrameTimestamp,
    },

    /// A timestamp string could not be parsed.
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The classification batch did not finish within its deadline.
    #[error("Classification batch timed out after {0:?}")]
    BatchTimeout(Duration),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// A background task panicked or was aborted.
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// The classifier failed outside of a per-frame request.
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// JSON report serialisation failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<FfmpegError> for ScreeningError {
    fn from(error: FfmpegError) -> Self {
        ScreeningError::FfmpegError(error.to_string())
    }
}

/// Failure of a single classification request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClassifierError {
    /// The request did not complete within the per-request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The service asked the client to slow down (HTTP 429).
    #[error("Rate limited by the moderation service")]
    RateLimited,

    /// The request never reached the service or the connection dropped.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service failed internally (HTTP 5xx).
    #[error("Service error {status}: {body}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// The service rejected the request, e.g. because the image is invalid.
    #[error("Request rejected {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// The API key was refused.
    #[error("Unauthorized: the moderation service refused the API key")]
    Unauthorized,

    /// The response body could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClassifierError {
    /// Returns `true` when the same request may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::RateLimited | Self::Transport(_) | Self::Server { .. }
        )
    }
}
