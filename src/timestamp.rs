//! Frame timestamps.
//!
//! [`FrameTimestamp`] labels a sampled frame by its position in the video.
//! It is ordered by the underlying [`Duration`] and rendered as
//! `hh-mm-ss.ff` (hundredths, truncated), a form that is safe to use as a
//! file name and is the form used in reports.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
    time::Duration,
};

use serde::{Serialize, Serializer};

use crate::error::ScreeningError;

/// Position of a sampled frame within its video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameTimestamp(Duration);

impl FrameTimestamp {
    /// The start of the video.
    pub const ZERO: FrameTimestamp = FrameTimestamp(Duration::ZERO);

    /// Wrap an offset from the start of the video.
    pub const fn new(offset: Duration) -> Self {
        Self(offset)
    }

    /// Build a timestamp from fractional seconds. Negative or non-finite
    /// values saturate to zero.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            Self(Duration::from_secs_f64(seconds))
        } else {
            Self::ZERO
        }
    }

    /// The offset from the start of the video.
    pub const fn offset(self) -> Duration {
        self.0
    }

    /// Render as `hh:mm:ss.ff`, the form used in log lines.
    pub fn colon(self) -> String {
        let (hours, minutes, seconds, hundredths) = self.parts();
        format!("{hours:02}:{minutes:02}:{seconds:02}.{hundredths:02}")
    }

    fn parts(self) -> (u64, u64, u64, u32) {
        let total_seconds = self.0.as_secs();
        (
            total_seconds / 3600,
            (total_seconds / 60) % 60,
            total_seconds % 60,
            self.0.subsec_millis() / 10,
        )
    }
}

impl From<Duration> for FrameTimestamp {
    fn from(offset: Duration) -> Self {
        Self(offset)
    }
}

impl Display for FrameTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let (hours, minutes, seconds, hundredths) = self.parts();
        write!(f, "{hours:02}-{minutes:02}-{seconds:02}.{hundredths:02}")
    }
}

impl FromStr for FrameTimestamp {
    type Err = ScreeningError;

    /// Parse `hh-mm-ss.ff` or `hh:mm:ss.ff`. The fractional part is optional.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ScreeningError::InvalidTimestamp(value.to_string());

        let fields: Vec<&str> = value.trim().split(['-', ':']).collect();
        let [hours, minutes, seconds] = fields.as_slice() else {
            return Err(invalid());
        };

        let hours: u64 = hours.parse().map_err(|_| invalid())?;
        let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
        let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        if minutes >= 60 || whole >= 60 {
            return Err(invalid());
        }

        let millis = if fraction.is_empty() {
            0
        } else {
            if fraction.len() > 3 || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(invalid());
            }
            // Right-pad so that ".5" means 500 ms.
            format!("{fraction:0<3}").parse::<u64>().map_err(|_| invalid())?
        };

        let seconds = hours
            .checked_mul(3600)
            .and_then(|total| total.checked_add(minutes * 60 + whole))
            .ok_or_else(invalid)?;
        Duration::from_secs(seconds)
            .checked_add(Duration::from_millis(millis))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Serialize for FrameTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
