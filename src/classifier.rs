//! The safety-classifier capability and its results.
//!
//! [`SafetyClassifier`] is the seam between the pipeline and a concrete
//! moderation service: submit one JPEG-encoded image, receive a
//! [`Classification`] or a [`ClassifierError`]. The production
//! implementation is [`ContentSafetyClient`](crate::ContentSafetyClient);
//! tests substitute an in-memory classifier.
//!
//! # Example
//!
//! ```
//! use framescreen::{Category, Classification, ClassifierError, SafetyClassifier};
//!
//! struct AlwaysViolent;
//!
//! impl SafetyClassifier for AlwaysViolent {
//!     async fn classify(&self, _jpeg: &[u8]) -> Result<Classification, ClassifierError> {
//!         Ok(Classification::new().with_severity(Category::Violence, 4))
//!     }
//! }
//! ```

use std::{collections::BTreeMap, future::Future};

use serde::Serialize;

use crate::{category::Category, error::ClassifierError, timestamp::FrameTimestamp};

/// A moderation service that rates one image per call.
///
/// Calls are independent and stateless; the batch executor may run many of
/// them concurrently, so implementations must be [`Send`] and [`Sync`].
pub trait SafetyClassifier: Send + Sync {
    /// Classify a JPEG-encoded image.
    fn classify(
        &self,
        jpeg: &[u8],
    ) -> impl Future<Output = Result<Classification, ClassifierError>> + Send;
}

/// Per-category severities returned for one image.
///
/// Categories the service did not report read as severity 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Classification {
    severities: BTreeMap<Category, u32>,
}

impl Classification {
    /// An empty classification (every category safe).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the severity of one category.
    #[must_use]
    pub fn with_severity(mut self, category: Category, severity: u32) -> Self {
        self.severities.insert(category, severity);
        self
    }

    /// Severity of `category`, 0 when unreported.
    pub fn severity(&self, category: Category) -> u32 {
        self.severities.get(&category).copied().unwrap_or(0)
    }

    /// `true` when `category` has a severity above zero.
    pub fn is_unsafe(&self, category: Category) -> bool {
        self.severity(category) > 0
    }

    /// `true` when any category is unsafe.
    pub fn any_unsafe(&self) -> bool {
        self.severities.values().any(|&severity| severity > 0)
    }

    /// The worst-offending category and its severity, if any is unsafe.
    ///
    /// Ties go to the category listed first in [`Category::ALL`].
    pub fn worst(&self) -> Option<(Category, u32)> {
        Category::ALL
            .into_iter()
            .map(|category| (category, self.severity(category)))
            .filter(|&(_, severity)| severity > 0)
            .fold(None, |best, candidate| match best {
                Some((_, best_severity)) if best_severity >= candidate.1 => best,
                _ => Some(candidate),
            })
    }
}

impl FromIterator<(Category, u32)> for Classification {
    fn from_iter<I: IntoIterator<Item = (Category, u32)>>(iter: I) -> Self {
        Self {
            severities: iter.into_iter().collect(),
        }
    }
}

/// What became of one sampled frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// The service rated the frame.
    Classified(Classification),
    /// Classification failed permanently or ran out of retries.
    Unavailable {
        /// Human-readable cause.
        reason: String,
    },
}

/// The classification outcome for one sampled frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameVerdict {
    /// When the frame was sampled.
    pub timestamp: FrameTimestamp,
    /// The classifier's answer for the frame.
    pub outcome: FrameOutcome,
}

impl FrameVerdict {
    /// A successfully classified frame.
    pub fn classified(timestamp: FrameTimestamp, classification: Classification) -> Self {
        Self {
            timestamp,
            outcome: FrameOutcome::Classified(classification),
        }
    }

    /// A frame whose classification is unavailable.
    pub fn unavailable(timestamp: FrameTimestamp, reason: impl Into<String>) -> Self {
        Self {
            timestamp,
            outcome: FrameOutcome::Unavailable {
                reason: reason.into(),
            },
        }
    }

    /// The classification, if the frame was rated.
    pub fn classification(&self) -> Option<&Classification> {
        match &self.outcome {
            FrameOutcome::Classified(classification) => Some(classification),
            FrameOutcome::Unavailable { .. } => None,
        }
    }

    /// `true` when the frame could not be classified.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.outcome, FrameOutcome::Unavailable { .. })
    }
}
