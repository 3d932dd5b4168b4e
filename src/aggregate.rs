//! Range aggregation.
//!
//! Converts per-frame, per-category safety signals into the minimal list of
//! closed timestamp intervals covering each maximal run of consecutive
//! unsafe frames.
//!
//! Two boundary policies apply:
//!
//! - A range still open when the frames run out is flushed, ending at the
//!   last unsafe frame.
//! - A frame whose classification is unavailable closes any open range at
//!   the last unsafe frame before it. It never opens a range and is never a
//!   range endpoint, so `[unsafe, unavailable, unsafe]` yields two
//!   single-frame ranges rather than one range spanning the gap.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framescreen::{Category, FrameTimestamp, Observation, aggregate_category};
//!
//! let at = |seconds| FrameTimestamp::new(Duration::from_secs(seconds));
//! let ranges = aggregate_category(
//!     Category::Violence,
//!     [
//!         (at(1), Observation::Safe),
//!         (at(2), Observation::Unsafe),
//!         (at(3), Observation::Unsafe),
//!         (at(4), Observation::Safe),
//!     ],
//! )?;
//!
//! assert_eq!(ranges.len(), 1);
//! assert_eq!(ranges[0].to_string(), "00-00-02.00 -> 00-00-03.00: Violence");
//! # Ok::<(), framescreen::ScreeningError>(())
//! ```

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
};

use serde::Serialize;

use crate::{
    category::Category,
    classifier::{FrameOutcome, FrameVerdict},
    error::ScreeningError,
    timestamp::FrameTimestamp,
};

/// The safety signal for one category on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Severity above zero.
    Unsafe,
    /// Severity zero.
    Safe,
    /// The frame could not be classified.
    Unavailable,
}

impl Observation {
    /// Derive the observation for `category` from a frame's verdict.
    pub fn of(verdict: &FrameVerdict, category: Category) -> Self {
        match &verdict.outcome {
            FrameOutcome::Classified(classification) if classification.is_unsafe(category) => {
                Observation::Unsafe
            }
            FrameOutcome::Classified(_) => Observation::Safe,
            FrameOutcome::Unavailable { .. } => Observation::Unavailable,
        }
    }
}

/// A contiguous interval during which one category was flagged unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnsafeRange {
    /// The flagged category.
    pub category: Category,
    /// First unsafe frame of the run.
    pub start: FrameTimestamp,
    /// Last unsafe frame of the run; equal to `start` for a single frame.
    pub end: FrameTimestamp,
}

impl UnsafeRange {
    /// `true` when the run covers exactly one sampled frame.
    pub fn is_single_frame(&self) -> bool {
        self.start == self.end
    }
}

impl Display for UnsafeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.is_single_frame() {
            write!(f, "{}: {}", self.start, self.category)
        } else {
            write!(f, "{} -> {}: {}", self.start, self.end, self.category)
        }
    }
}

/// Unsafe ranges for every category, in [`Category::ALL`] order.
///
/// Every category is present, possibly with no ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnsafeRanges {
    ranges: BTreeMap<Category, Vec<UnsafeRange>>,
}

impl UnsafeRanges {
    /// The ranges for one category.
    pub fn get(&self, category: Category) -> &[UnsafeRange] {
        self.ranges.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate `(category, ranges)` in report order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[UnsafeRange])> {
        self.ranges
            .iter()
            .map(|(category, ranges)| (*category, ranges.as_slice()))
    }

    /// Total number of ranges across categories.
    pub fn len(&self) -> usize {
        self.ranges.values().map(Vec::len).sum()
    }

    /// `true` when no category has any range.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UnsafeRanges {
    fn default() -> Self {
        Self {
            ranges: Category::ALL
                .into_iter()
                .map(|category| (category, Vec::new()))
                .collect(),
        }
    }
}

/// Fold state for one category.
#[derive(Debug, Default)]
struct RunState {
    /// `(start, last unsafe frame)` of the run in progress.
    open: Option<(FrameTimestamp, FrameTimestamp)>,
    previous: Option<FrameTimestamp>,
    emitted: Vec<UnsafeRange>,
}

impl RunState {
    fn close(&mut self, category: Category) {
        if let Some((start, end)) = self.open.take() {
            self.emitted.push(UnsafeRange {
                category,
                start,
                end,
            });
        }
    }
}

/// Aggregate one category's observations into unsafe ranges.
///
/// Observations must be in strictly increasing timestamp order.
///
/// # Errors
///
/// Returns [`ScreeningError::UnorderedTimestamps`] if a timestamp does not
/// advance past its predecessor.
pub fn aggregate_category<I>(
    category: Category,
    observations: I,
) -> Result<Vec<UnsafeRange>, ScreeningError>
where
    I: IntoIterator<Item = (FrameTimestamp, Observation)>,
{
    let mut state = observations.into_iter().try_fold(
        RunState::default(),
        |mut state, (timestamp, observation)| {
            if let Some(previous) = state.previous.filter(|&previous| timestamp <= previous) {
                return Err(ScreeningError::UnorderedTimestamps {
                    previous,
                    current: timestamp,
                });
            }
            state.previous = Some(timestamp);

            match observation {
                Observation::Unsafe => {
                    let start = state.open.map_or(timestamp, |(start, _)| start);
                    state.open = Some((start, timestamp));
                }
                Observation::Safe | Observation::Unavailable => state.close(category),
            }

            Ok(state)
        },
    )?;

    state.close(category);
    Ok(state.emitted)
}

/// Aggregate a full set of frame verdicts into ranges for every category.
///
/// Verdicts must be in strictly increasing timestamp order.
///
/// # Errors
///
/// Returns [`ScreeningError::UnorderedTimestamps`] if the verdicts are not
/// ordered.
pub fn aggregate(verdicts: &[FrameVerdict]) -> Result<UnsafeRanges, ScreeningError> {
    let mut ranges = UnsafeRanges::default();
    for category in Category::ALL {
        let category_ranges = aggregate_category(
            category,
            verdicts
                .iter()
                .map(|verdict| (verdict.timestamp, Observation::of(verdict, category))),
        )?;
        ranges.ranges.insert(category, category_ranges);
    }

    log::debug!(
        "Aggregated {} frames into {} unsafe ranges",
        verdicts.len(),
        ranges.len()
    );

    Ok(ranges)
}
