//! Screening configuration.
//!
//! [`ServiceCredentials`] carries the moderation endpoint and API key, read
//! from the process environment. [`ScreeningOptions`] is a builder that
//! threads the sampling rate, batch tuning, progress callbacks, and
//! cancellation through [`VideoScreener`](crate::VideoScreener).
//!
//! # Example
//!
//! ```no_run
//! use framescreen::{BatchOptions, CancellationToken, ScreeningOptions, ServiceCredentials};
//!
//! let credentials = ServiceCredentials::from_env()?;
//! let options = ScreeningOptions::new()
//!     .with_samples_per_second(2.0)
//!     .with_batch(BatchOptions::new().with_max_concurrency(4))
//!     .with_cancellation(CancellationToken::new());
//! # Ok::<(), framescreen::ScreeningError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::PathBuf,
    sync::Arc,
};

use url::Url;

use crate::{
    batch::BatchOptions,
    error::ScreeningError,
    progress::{CancellationToken, NoOpProgress, ProgressCallback},
    sampler,
};

/// Environment variable holding the moderation service endpoint.
pub const ENDPOINT_VARIABLE: &str = "CONTENT_SAFETY_ENDPOINT";
/// Environment variable holding the moderation service API key.
pub const API_KEY_VARIABLE: &str = "CONTENT_SAFETY_KEY";

/// Endpoint and key for the moderation service.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceCredentials {
    /// Base URL of the service, e.g. `https://name.cognitiveservices.azure.com/`.
    pub endpoint: Url,
    /// Subscription key sent with every request.
    pub api_key: String,
}

impl Debug for ServiceCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ServiceCredentials")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ServiceCredentials {
    /// Validate an endpoint and key.
    ///
    /// # Errors
    ///
    /// Returns [`ScreeningError::InvalidConfiguration`] if the endpoint is not
    /// an `http(s)` URL or the key is blank.
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, ScreeningError> {
        let endpoint = Url::parse(endpoint.trim()).map_err(|error| {
            ScreeningError::InvalidConfiguration {
                name: ENDPOINT_VARIABLE,
                reason: error.to_string(),
            }
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ScreeningError::InvalidConfiguration {
                name: ENDPOINT_VARIABLE,
                reason: format!("unsupported scheme {:?}", endpoint.scheme()),
            });
        }

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ScreeningError::MissingConfiguration {
                variable: API_KEY_VARIABLE,
            });
        }

        Ok(Self {
            endpoint,
            api_key: api_key.to_string(),
        })
    }

    /// Read credentials from `CONTENT_SAFETY_ENDPOINT` and `CONTENT_SAFETY_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ScreeningError::MissingConfiguration`] naming the first
    /// variable that is unset or empty.
    pub fn from_env() -> Result<Self, ScreeningError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](ServiceCredentials::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScreeningError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |variable: &'static str| {
            lookup(variable)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ScreeningError::MissingConfiguration { variable })
        };

        let endpoint = read(ENDPOINT_VARIABLE)?;
        let api_key = read(API_KEY_VARIABLE)?;
        Self::new(&endpoint, &api_key)
    }
}

/// Settings for one screening run.
///
/// All fields have defaults: one sample per second, default
/// [`BatchOptions`], no progress callback, no cancellation, and frames
/// stored under the system temporary directory.
#[derive(Clone)]
pub struct ScreeningOptions {
    pub(crate) samples_per_second: f64,
    pub(crate) batch: BatchOptions,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) frames_root: Option<PathBuf>,
}

impl Debug for ScreeningOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScreeningOptions")
            .field("samples_per_second", &self.samples_per_second)
            .field("batch", &self.batch)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("frames_root", &self.frames_root)
            .finish()
    }
}

impl Default for ScreeningOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreeningOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            samples_per_second: 1.0,
            batch: BatchOptions::default(),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            frames_root: None,
        }
    }

    /// Set how many frames are sampled per second of video.
    #[must_use]
    pub fn with_samples_per_second(mut self, samples_per_second: f64) -> Self {
        self.samples_per_second = samples_per_second;
        self
    }

    /// Set the classification batch tuning.
    #[must_use]
    pub fn with_batch(mut self, batch: BatchOptions) -> Self {
        self.batch = batch;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// Cancelling stops the run with [`ScreeningError::Cancelled`]; no report
    /// is produced.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Create the per-run frames directory under `root` instead of the
    /// system temporary directory.
    #[must_use]
    pub fn with_frames_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.frames_root = Some(root.into());
        self
    }

    /// The configured sampling rate.
    pub fn samples_per_second(&self) -> f64 {
        self.samples_per_second
    }

    /// The configured batch tuning.
    pub fn batch(&self) -> &BatchOptions {
        &self.batch
    }

    /// Check values that cannot be validated at construction.
    ///
    /// # Errors
    ///
    /// Returns [`ScreeningError::InvalidSamplingRate`] for an unusable rate.
    pub fn validate(&self) -> Result<(), ScreeningError> {
        sampler::validate_sampling_rate(self.samples_per_second)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
