//! Bounded-concurrency classification batches.
//!
//! [`BatchExecutor`] submits one request per frame to a [`SafetyClassifier`]
//! and waits for every request to finish before returning. Three controls
//! shape the traffic:
//!
//! - a pacer hands out request start slots at least
//!   [`submission_interval`](BatchOptions::with_submission_interval) apart,
//!   retries included;
//! - a semaphore caps requests in flight at
//!   [`max_concurrency`](BatchOptions::with_max_concurrency); frames waiting
//!   out a retry backoff do not count;
//! - each attempt is bounded by
//!   [`request_timeout`](BatchOptions::with_request_timeout) and the whole
//!   batch by [`batch_timeout`](BatchOptions::with_batch_timeout).
//!
//! Transient failures are retried with exponential backoff per
//! [`RetryPolicy`]. A frame that fails permanently, or runs out of attempts,
//! is marked unavailable; it never fails the batch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framescreen::{
//!     BatchExecutor, BatchOptions, ContentSafetyClient, PreparedFrame, ServiceCredentials,
//! };
//!
//! # async fn example(frames: Vec<PreparedFrame>) -> Result<(), framescreen::ScreeningError> {
//! let client = ContentSafetyClient::new(&ServiceCredentials::from_env()?)?;
//! let verdicts = BatchExecutor::new(Arc::new(client), BatchOptions::new())
//!     .run(frames)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    sync::Semaphore,
    task::JoinSet,
    time::{Instant, sleep, sleep_until, timeout},
};

use crate::{
    classifier::{FrameOutcome, FrameVerdict, SafetyClassifier},
    error::{ClassifierError, ScreeningError},
    progress::{CancellationToken, NoOpProgress, OperationType, ProgressCallback, StageProgress},
    timestamp::FrameTimestamp,
};

/// How often a pending batch checks its cancellation token.
const CANCELLATION_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exponential backoff for transient classification failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Three attempts, backing off from 500 ms up to 8 s.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Total attempts per frame, including the first. Clamped to at least 1.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry.
    #[must_use]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Upper bound for any single delay.
    #[must_use]
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Total attempts per frame.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the `attempt`-th failure (1-based): the initial backoff
    /// doubled per prior retry, capped at the maximum.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1 << doublings)
            .min(self.max_backoff)
    }
}

/// Tuning for a classification batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub(crate) submission_interval: Duration,
    pub(crate) max_concurrency: usize,
    pub(crate) request_timeout: Duration,
    pub(crate) batch_timeout: Option<Duration>,
    pub(crate) retry: RetryPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            submission_interval: Duration::from_millis(200),
            max_concurrency: 8,
            request_timeout: Duration::from_secs(30),
            batch_timeout: Some(Duration::from_secs(600)),
            retry: RetryPolicy::default(),
        }
    }
}

impl BatchOptions {
    /// 200 ms between submissions, 8 in flight, 30 s per request, 10 min
    /// per batch, default [`RetryPolicy`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum spacing between request starts. Zero disables pacing.
    #[must_use]
    pub fn with_submission_interval(mut self, interval: Duration) -> Self {
        self.submission_interval = interval;
        self
    }

    /// Maximum requests in flight. Clamped to at least 1.
    #[must_use]
    pub fn with_max_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency.max(1);
        self
    }

    /// Deadline for each individual attempt.
    #[must_use]
    pub fn with_request_timeout(mut self, limit: Duration) -> Self {
        self.request_timeout = limit;
        self
    }

    /// Deadline for the whole batch. `None` waits indefinitely.
    #[must_use]
    pub fn with_batch_timeout(mut self, limit: Option<Duration>) -> Self {
        self.batch_timeout = limit;
        self
    }

    /// Retry behaviour for transient failures.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The configured retry policy.
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Maximum requests in flight.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

/// A frame ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFrame {
    /// Grid point of the frame.
    pub timestamp: FrameTimestamp,
    /// JPEG-encoded image.
    pub jpeg: Vec<u8>,
}

/// Hands out request start slots no closer than the configured interval.
struct Pacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next_slot = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = next_slot.map_or(now, |reserved| reserved.max(now));
            *next_slot = Some(slot + self.interval);
            slot
        };
        sleep_until(slot).await;
    }
}

/// Runs one classification batch.
pub struct BatchExecutor<C> {
    classifier: Arc<C>,
    options: BatchOptions,
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
}

impl<C> Debug for BatchExecutor<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BatchExecutor")
            .field("options", &self.options)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: SafetyClassifier + 'static> BatchExecutor<C> {
    /// Create an executor for `classifier`.
    pub fn new(classifier: Arc<C>, options: BatchOptions) -> Self {
        Self {
            classifier,
            options,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Report each finished frame to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Stop with [`ScreeningError::Cancelled`] once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: Option<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Classify every frame and return verdicts in input order.
    ///
    /// # Errors
    ///
    /// - [`ScreeningError::BatchTimeout`] if the batch deadline passes.
    /// - [`ScreeningError::Cancelled`] if the token is cancelled.
    /// - [`ScreeningError::TaskFailed`] if a request task panics.
    ///
    /// Per-frame failures are not errors; they become unavailable verdicts.
    pub async fn run(
        &self,
        frames: Vec<PreparedFrame>,
    ) -> Result<Vec<FrameVerdict>, ScreeningError> {
        match self.options.batch_timeout {
            Some(limit) => timeout(limit, self.run_to_completion(frames))
                .await
                .map_err(|_| ScreeningError::BatchTimeout(limit))?,
            None => self.run_to_completion(frames).await,
        }
    }

    async fn run_to_completion(
        &self,
        frames: Vec<PreparedFrame>,
    ) -> Result<Vec<FrameVerdict>, ScreeningError> {
        if self.is_cancelled() {
            return Err(ScreeningError::Cancelled);
        }

        let total = frames.len();
        log::info!(
            "Submitting {total} frames ({} in flight, {:?} apart)",
            self.options.max_concurrency,
            self.options.submission_interval
        );

        let timestamps: Vec<FrameTimestamp> =
            frames.iter().map(|frame| frame.timestamp).collect();
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency));
        let pacer = Arc::new(Pacer::new(self.options.submission_interval));
        let options = Arc::new(self.options.clone());

        let mut tasks = JoinSet::new();
        for (index, frame) in frames.into_iter().enumerate() {
            let classifier = Arc::clone(&self.classifier);
            let semaphore = Arc::clone(&semaphore);
            let pacer = Arc::clone(&pacer);
            let options = Arc::clone(&options);

            tasks.spawn(async move {
                let outcome =
                    classify_with_retry(&*classifier, &frame, &options, &semaphore, &pacer).await;
                (index, outcome)
            });
        }

        let mut tracker = StageProgress::new(
            Arc::clone(&self.progress),
            OperationType::Classification,
            Some(total as u64),
        );
        let mut outcomes: Vec<Option<FrameOutcome>> = vec![None; total];

        while let Some(joined) = self.join_next(&mut tasks).await? {
            let (index, outcome) =
                joined.map_err(|error| ScreeningError::TaskFailed(error.to_string()))?;
            tracker.advance(Some(timestamps[index]));
            outcomes[index] = Some(outcome);
        }
        tracker.finish();

        let verdicts: Vec<FrameVerdict> = timestamps
            .into_iter()
            .zip(outcomes)
            .map(|(timestamp, outcome)| FrameVerdict {
                timestamp,
                outcome: outcome.unwrap_or_else(|| FrameOutcome::Unavailable {
                    reason: "request task did not report".to_string(),
                }),
            })
            .collect();

        let unavailable = verdicts.iter().filter(|verdict| verdict.is_unavailable()).count();
        log::info!(
            "Classified {} of {total} frames ({unavailable} unavailable)",
            total - unavailable
        );

        Ok(verdicts)
    }

    /// Wait for the next task, bailing out early on cancellation.
    async fn join_next<T: 'static>(
        &self,
        tasks: &mut JoinSet<T>,
    ) -> Result<Option<Result<T, tokio::task::JoinError>>, ScreeningError> {
        let Some(token) = &self.cancellation else {
            return Ok(tasks.join_next().await);
        };

        tokio::select! {
            joined = tasks.join_next() => Ok(joined),
            () = wait_for_cancellation(token) => {
                log::warn!("Classification cancelled with {} requests outstanding", tasks.len());
                Err(ScreeningError::Cancelled)
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

async fn wait_for_cancellation(token: &CancellationToken) {
    while !token.is_cancelled() {
        sleep(CANCELLATION_POLL_INTERVAL).await;
    }
}

/// Classify one frame, retrying transient failures.
///
/// A concurrency slot is held for each attempt only, never across a backoff.
async fn classify_with_retry<C: SafetyClassifier>(
    classifier: &C,
    frame: &PreparedFrame,
    options: &BatchOptions,
    semaphore: &Semaphore,
    pacer: &Pacer,
) -> FrameOutcome {
    let mut attempt = 1;
    loop {
        let result = {
            // The semaphore is never closed, so acquisition cannot fail.
            let _permit = semaphore.acquire().await.ok();
            pacer.wait().await;

            timeout(options.request_timeout, classifier.classify(&frame.jpeg))
                .await
                .unwrap_or(Err(ClassifierError::Timeout(options.request_timeout)))
        };

        match result {
            Ok(classification) => {
                log::debug!(
                    "Frame {} classified on attempt {attempt}",
                    frame.timestamp.colon()
                );
                return FrameOutcome::Classified(classification);
            }
            Err(error) if error.is_transient() && attempt < options.retry.max_attempts => {
                let delay = options.retry.backoff_for(attempt);
                log::debug!(
                    "Frame {} attempt {attempt} failed ({error}); retrying in {delay:?}",
                    frame.timestamp.colon()
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                log::warn!(
                    "Frame {} unavailable after {attempt} attempt(s): {error}",
                    frame.timestamp.colon()
                );
                return FrameOutcome::Unavailable {
                    reason: error.to_string(),
                };
            }
        }
    }
}
