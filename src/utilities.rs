//! Internal utility functions.
//!
//! Helpers for pixel-data copying and time conversion shared by the
//! sampler.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an FFmpeg RGB24 frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// This function strips that padding so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Offset of the `index`-th point on a sampling grid of `rate` samples per
/// second.
pub(crate) fn grid_point(index: u64, rate: f64) -> Duration {
    Duration::from_secs_f64(index as f64 / rate)
}

/// Index of the first grid point strictly after `seconds`.
pub(crate) fn next_grid_index_after(seconds: f64, rate: f64) -> u64 {
    if seconds < 0.0 {
        return 0;
    }
    (seconds * rate).floor() as u64 + 1
}

/// Tolerance for frames whose PTS lands a hair before a grid point.
pub(crate) const GRID_TOLERANCE_SECONDS: f64 = 1e-6;

/// Decide whether a frame decoded at `seconds` answers grid point
/// `next_index`.
///
/// Returns the grid point's offset and the index to wait for afterwards. A
/// frame that lands past several grid points answers the first of them and
/// the rest are skipped.
pub(crate) fn grid_decision(seconds: f64, next_index: u64, rate: f64) -> Option<(Duration, u64)> {
    let due = grid_point(next_index, rate);
    if seconds + GRID_TOLERANCE_SECONDS < due.as_secs_f64() {
        return None;
    }
    let following = (next_index + 1).max(next_grid_index_after(seconds, rate));
    Some((due, following))
}

/// Position of the `decoded`-th frame (0-based) in a stream that carries no
/// timestamps. Zero when the frame rate is unknown.
pub(crate) fn position_from_frame_count(decoded: u64, frames_per_second: f64) -> f64 {
    if frames_per_second > 0.0 {
        decoded as f64 / frames_per_second
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_points_follow_rate() {
        assert_eq!(grid_point(0, 1.0), Duration::ZERO);
        assert_eq!(grid_point(3, 2.0), Duration::from_millis(1500));
    }

    #[test]
    fn next_grid_index_skips_passed_points() {
        assert_eq!(next_grid_index_after(0.0, 1.0), 1);
        assert_eq!(next_grid_index_after(2.4, 1.0), 3);
        assert_eq!(next_grid_index_after(2.4, 2.0), 5);
        assert_eq!(next_grid_index_after(-0.1, 1.0), 0);
    }

    #[test]
    fn pts_rescales_with_time_base() {
        let seconds = pts_to_seconds(90_000, Rational::new(1, 90_000));
        assert!((seconds - 1.0).abs() < f64::EPSILON);
        assert_eq!(pts_to_seconds(10, Rational::new(1, 0)), 0.0);
    }

    #[test]
    fn frame_before_grid_point_is_skipped() {
        assert_eq!(grid_decision(0.5, 1, 1.0), None);
        assert_eq!(grid_decision(0.25, 1, 2.0), None);
    }

    #[test]
    fn first_frame_at_or_after_grid_point_takes_its_label() {
        assert_eq!(grid_decision(0.0, 0, 1.0), Some((Duration::ZERO, 1)));
        assert_eq!(grid_decision(1.0, 1, 1.0), Some((Duration::from_secs(1), 2)));
        assert_eq!(grid_decision(1.4, 1, 1.0), Some((Duration::from_secs(1), 2)));
        assert_eq!(grid_decision(0.52, 1, 2.0), Some((Duration::from_millis(500), 2)));
    }

    #[test]
    fn sparse_frames_skip_passed_grid_points() {
        // Labelled with the oldest pending point; the ones it jumped over are dropped.
        assert_eq!(grid_decision(3.2, 1, 1.0), Some((Duration::from_secs(1), 4)));
        assert_eq!(grid_decision(2.0, 0, 2.0), Some((Duration::ZERO, 5)));
    }

    #[test]
    fn frames_just_short_of_a_grid_point_are_accepted() {
        assert_eq!(grid_decision(2.0 - 1e-7, 2, 1.0), Some((Duration::from_secs(2), 3)));
        assert_eq!(grid_decision(2.0 - 1e-3, 2, 1.0), None);
    }

    #[test]
    fn untimed_frames_are_placed_by_count() {
        assert_eq!(position_from_frame_count(0, 25.0), 0.0);
        assert_eq!(position_from_frame_count(50, 25.0), 2.0);
        assert_eq!(position_from_frame_count(7, 0.0), 0.0);
    }
}
