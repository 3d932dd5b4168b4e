//! Report rendering.
//!
//! A [`ScreeningReport`] can be written in three forms:
//!
//! - [`ReportFormat::Ranges`]: for each category, its name, one line per
//!   unsafe range (`start -> end: Category` or `start: Category`), and a
//!   blank separator line. Categories without ranges still get a header.
//! - [`ReportFormat::Frames`]: the frame-centric listing, one line per frame
//!   that is unsafe (`timestamp Category: severity`, naming the worst
//!   category) or unavailable (`timestamp unavailable: reason`).
//! - [`ReportFormat::Json`]: the full report as pretty-printed JSON.
//!
//! Rendering is pure; [`save`] writes the rendered text in one call.

use std::{
    fmt::{Display, Formatter, Result as FmtResult, Write as _},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Serialize;

use crate::{
    aggregate::UnsafeRanges,
    classifier::{FrameOutcome, FrameVerdict},
    error::ScreeningError,
};

/// The outcome of screening one video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningReport {
    /// The screened file.
    pub video: PathBuf,
    /// Sampling rate used.
    pub samples_per_second: f64,
    /// Unsafe ranges per category.
    pub ranges: UnsafeRanges,
    /// Per-frame outcomes in timestamp order.
    pub frames: Vec<FrameVerdict>,
}

impl ScreeningReport {
    /// Frames with at least one unsafe category.
    pub fn unsafe_frame_count(&self) -> usize {
        self.frames
            .iter()
            .filter(|verdict| {
                verdict
                    .classification()
                    .is_some_and(|classification| classification.any_unsafe())
            })
            .count()
    }

    /// Frames that could not be classified.
    pub fn unavailable_count(&self) -> usize {
        self.frames
            .iter()
            .filter(|verdict| verdict.is_unavailable())
            .count()
    }
}

/// Output layout of a report file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Ranges grouped by category.
    #[default]
    Ranges,
    /// One line per unsafe or unavailable frame.
    Frames,
    /// JSON document.
    Json,
}

impl ReportFormat {
    /// File name used when no output path is given.
    pub fn default_file_name(self) -> &'static str {
        match self {
            ReportFormat::Ranges => "Unsafe Ranges.txt",
            ReportFormat::Frames => "Unsafe Frames.txt",
            ReportFormat::Json => "Unsafe Ranges.json",
        }
    }
}

impl Display for ReportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            ReportFormat::Ranges => "ranges",
            ReportFormat::Frames => "frames",
            ReportFormat::Json => "json",
        })
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ranges" | "range" => Ok(ReportFormat::Ranges),
            "frames" | "frame" => Ok(ReportFormat::Frames),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unsupported report format: {other}")),
        }
    }
}

/// Render unsafe ranges grouped by category.
pub fn render_ranges(ranges: &UnsafeRanges) -> String {
    let mut output = String::new();
    for (category, category_ranges) in ranges.iter() {
        let _ = writeln!(output, "{category}");
        for range in category_ranges {
            let _ = writeln!(output, "{range}");
        }
        output.push('\n');
    }
    output
}

/// Render the frame-centric listing.
pub fn render_frames(frames: &[FrameVerdict]) -> String {
    let mut output = String::new();
    for verdict in frames {
        match &verdict.outcome {
            FrameOutcome::Classified(classification) => {
                if let Some((category, severity)) = classification.worst() {
                    let _ = writeln!(output, "{} {category}: {severity}", verdict.timestamp);
                }
            }
            FrameOutcome::Unavailable { reason } => {
                let _ = writeln!(output, "{} unavailable: {reason}", verdict.timestamp);
            }
        }
    }
    output
}

/// Render `report` in `format`.
///
/// # Errors
///
/// Returns [`ScreeningError::JsonError`] if JSON serialisation fails.
pub fn render(report: &ScreeningReport, format: ReportFormat) -> Result<String, ScreeningError> {
    Ok(match format {
        ReportFormat::Ranges => render_ranges(&report.ranges),
        ReportFormat::Frames => render_frames(&report.frames),
        ReportFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            json
        }
    })
}

/// Render `report` and write it to `path`.
///
/// # Errors
///
/// Fails on serialisation or I/O errors.
pub fn save<P: AsRef<Path>>(
    path: P,
    report: &ScreeningReport,
    format: ReportFormat,
) -> Result<(), ScreeningError> {
    let rendered = render(report, format)?;
    fs::write(path.as_ref(), rendered)?;
    log::info!("Wrote {format} report to {}", path.as_ref().display());
    Ok(())
}
