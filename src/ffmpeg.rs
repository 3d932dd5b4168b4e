//! FFmpeg log level alignment.
//!
//! FFmpeg prints its own diagnostics to stderr, independent of the Rust
//! [`log`](https://crates.io/crates/log) facade. [`sync_ffmpeg_log_level`]
//! maps a [`log::LevelFilter`] onto the closest FFmpeg level so that one
//! verbosity setting governs both.
//!
//! # Example
//!
//! ```no_run
//! framescreen::sync_ffmpeg_log_level(log::max_level());
//! ```

use ffmpeg_next::util::log::Level;
use log::LevelFilter;

/// The FFmpeg level matching a Rust log filter.
///
/// FFmpeg's informational output is chatty per frame, so `Info` maps one
/// step quieter to FFmpeg warnings.
pub fn ffmpeg_level_for(filter: LevelFilter) -> Level {
    match filter {
        LevelFilter::Off => Level::Quiet,
        LevelFilter::Error => Level::Error,
        LevelFilter::Warn | LevelFilter::Info => Level::Warning,
        LevelFilter::Debug => Level::Verbose,
        LevelFilter::Trace => Level::Debug,
    }
}

/// Set FFmpeg's internal log level to match `filter`.
pub fn sync_ffmpeg_log_level(filter: LevelFilter) {
    ffmpeg_next::util::log::set_level(ffmpeg_level_for(filter));
}
