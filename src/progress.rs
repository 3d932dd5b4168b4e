//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring a screening run,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressInfo`]
//! for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framescreen::{ProgressCallback, ProgressInfo, ScreeningOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let options = ScreeningOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::timestamp::FrameTimestamp;

/// The stage of a screening run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding the video and storing sampled frames.
    FrameSampling,
    /// Sending frames to the moderation service.
    Classification,
}

/// A snapshot of progress through one stage.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which stage is running.
    pub operation: OperationType,
    /// Items (frames) finished so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the stage started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Timestamp of the frame just finished.
    pub current_timestamp: Option<FrameTimestamp>,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] because callbacks are
/// invoked from blocking decode threads and async tasks.
///
/// Callbacks observe but cannot halt the run. Use [`CancellationToken`] for
/// cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called after each finished item and once when a stage completes.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it; call [`cancel`](CancellationToken::cancel)
/// from anywhere (a Ctrl-C handler, another task) to stop the run at the
/// next frame boundary.
///
/// # Example
///
/// ```
/// use framescreen::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.clone().cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts finished items for one stage and forwards snapshots to a
/// callback.
pub(crate) struct StageProgress {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    started: Instant,
}

impl StageProgress {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            started: Instant::now(),
        }
    }

    /// Record one finished frame.
    pub(crate) fn advance(&mut self, timestamp: Option<FrameTimestamp>) {
        self.current += 1;
        self.emit(timestamp);
    }

    /// Emit the closing snapshot. An unknown total becomes the final count.
    pub(crate) fn finish(&mut self) {
        self.total.get_or_insert(self.current);
        self.emit(None);
    }

    fn emit(&self, current_timestamp: Option<FrameTimestamp>) {
        let elapsed = self.started.elapsed();
        // Fraction done, clamped for streams that overrun their estimate.
        let fraction = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f64 / total as f64).min(1.0));

        let estimated_remaining = fraction
            .filter(|&fraction| fraction > 0.0)
            .map(|fraction| elapsed.mul_f64((1.0 - fraction) / fraction));

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage: fraction.map(|fraction| (fraction * 100.0) as f32),
            elapsed,
            estimated_remaining,
            current_timestamp,
        });
    }
}
