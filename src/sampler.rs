//! Periodic frame sampling.
//!
//! [`FrameSampler`] opens a video with FFmpeg and yields one frame per point
//! of a fixed sampling grid (`k / samples_per_second`). For each grid point
//! the first decoded frame presented at or after it is taken; frames in
//! between are decoded but dropped. Each sampled frame is labeled with its
//! grid point, so labels are strictly increasing and distinct at the
//! hundredth-of-a-second resolution used in reports.
//!
//! [`SampledFrames`] is lazy: every call to [`next()`](Iterator::next) reads
//! and decodes just enough packets to produce the next sample.
//!
//! # Example
//!
//! ```no_run
//! use framescreen::FrameSampler;
//!
//! let mut sampler = FrameSampler::open("input.mp4", 1.0)?;
//! for sample in sampler.frames()? {
//!     let sample = sample?;
//!     sample.image.save(format!("{}.png", sample.timestamp))?;
//! }
//! # Ok::<(), framescreen::ScreeningError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{error::ScreeningError, timestamp::FrameTimestamp, utilities};

/// Highest accepted sampling rate. Keeps grid points at least 10 ms apart so
/// their `hh-mm-ss.ff` labels never collide.
pub const MAX_SAMPLES_PER_SECOND: f64 = 100.0;

/// Properties of the sampled video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frame rate, 0.0 when unknown.
    pub frames_per_second: f64,
    /// Container duration, zero when unknown.
    pub duration: Duration,
    /// Decoder name.
    pub codec: String,
}

/// One sampled still.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Grid point the frame answers to.
    pub timestamp: FrameTimestamp,
    /// The decoded frame in RGB8.
    pub image: DynamicImage,
}

/// An opened video ready for periodic sampling.
pub struct FrameSampler {
    input_context: Input,
    video_stream_index: usize,
    metadata: VideoMetadata,
    samples_per_second: f64,
    file_path: PathBuf,
}

impl Debug for FrameSampler {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameSampler")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("samples_per_second", &self.samples_per_second)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl FrameSampler {
    /// Open `path` for sampling at `samples_per_second`.
    ///
    /// # Errors
    ///
    /// - [`ScreeningError::InvalidSamplingRate`] unless the rate is finite
    ///   and in `(0, 100]`.
    /// - [`ScreeningError::FileOpen`] if the file is missing or FFmpeg cannot
    ///   open it.
    /// - [`ScreeningError::NoVideoStream`] if it holds no video.
    pub fn open<P: AsRef<Path>>(path: P, samples_per_second: f64) -> Result<Self, ScreeningError> {
        validate_sampling_rate(samples_per_second)?;

        let path = path.as_ref();
        let file_path = path.to_path_buf();
        if !path.is_file() {
            return Err(ScreeningError::FileOpen {
                path: file_path,
                reason: "file does not exist".to_string(),
            });
        }

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| ScreeningError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| ScreeningError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(ScreeningError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| ScreeningError::FileOpen {
                path: file_path.clone(),
                reason: format!("Failed to create video decoder: {error}"),
            })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            0.0
        };

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            duration,
            codec: decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };

        log::info!(
            "Opened {} ({}x{}, {:.2} fps, {:?}), sampling {} frame(s) per second",
            file_path.display(),
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.duration,
            samples_per_second,
        );

        Ok(Self {
            input_context,
            video_stream_index,
            metadata,
            samples_per_second,
            file_path,
        })
    }

    /// Properties of the video stream being sampled.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// The configured sampling rate.
    pub fn samples_per_second(&self) -> f64 {
        self.samples_per_second
    }

    /// Number of samples the video should produce, if its duration is known.
    pub fn expected_samples(&self) -> Option<u64> {
        let seconds = self.metadata.duration.as_secs_f64();
        (seconds > 0.0).then(|| (seconds * self.samples_per_second).ceil() as u64)
    }

    /// Start decoding from the beginning of the video.
    ///
    /// # Errors
    ///
    /// Fails if the decoder or pixel-format converter cannot be created.
    pub fn frames(&mut self) -> Result<SampledFrames<'_>, ScreeningError> {
        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or(ScreeningError::NoVideoStream)?;
        let time_base = stream.time_base();
        let start_pts = stream.start_time();
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        // Streams without a start time report a large negative sentinel.
        let start_offset = if start_pts > 0 {
            utilities::pts_to_seconds(start_pts, time_base)
        } else {
            0.0
        };

        Ok(SampledFrames {
            input_context: &mut self.input_context,
            decoder,
            scaler,
            video_stream_index: self.video_stream_index,
            time_base,
            start_offset,
            samples_per_second: self.samples_per_second,
            frames_per_second: self.metadata.frames_per_second,
            next_grid_index: 0,
            decoded: 0,
            width,
            height,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            yielded: 0,
            eof_sent: false,
            done: false,
        })
    }
}

/// Reject sampling rates outside `(0, MAX_SAMPLES_PER_SECOND]`.
pub(crate) fn validate_sampling_rate(samples_per_second: f64) -> Result<(), ScreeningError> {
    if samples_per_second.is_finite()
        && samples_per_second > 0.0
        && samples_per_second <= MAX_SAMPLES_PER_SECOND
    {
        Ok(())
    } else {
        Err(ScreeningError::InvalidSamplingRate(samples_per_second))
    }
}

/// A lazy iterator over sampled frames.
///
/// Borrows the [`FrameSampler`] mutably; dropping the iterator releases it.
pub struct SampledFrames<'a> {
    input_context: &'a mut Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    time_base: Rational,
    start_offset: f64,
    samples_per_second: f64,
    frames_per_second: f64,
    next_grid_index: u64,
    decoded: u64,
    width: u32,
    height: u32,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    yielded: u64,
    eof_sent: bool,
    done: bool,
}

impl SampledFrames<'_> {
    /// If the frame in `decoded_frame` answers the next grid point, label it
    /// and advance the grid past it.
    fn take_if_due(&mut self) -> Option<FrameTimestamp> {
        let pts = self
            .decoded_frame
            .timestamp()
            .or_else(|| self.decoded_frame.pts());
        let seconds = match pts {
            Some(pts) => utilities::pts_to_seconds(pts, self.time_base) - self.start_offset,
            None => {
                let seconds =
                    utilities::position_from_frame_count(self.decoded, self.frames_per_second);
                log::debug!(
                    "Frame {} carries no timestamp; placing it at {seconds:.3}s",
                    self.decoded
                );
                seconds
            }
        };
        self.decoded += 1;

        let (due, following) =
            utilities::grid_decision(seconds, self.next_grid_index, self.samples_per_second)?;
        self.next_grid_index = following;
        Some(FrameTimestamp::new(due))
    }

    fn convert_current_frame(&mut self) -> Result<DynamicImage, ScreeningError> {
        self.scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;

        let buffer = utilities::frame_to_rgb_buffer(&self.rgb_frame, self.width, self.height);
        let image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            ScreeningError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })?;
        Ok(DynamicImage::ImageRgb8(image))
    }

    fn fail(&mut self, error: ScreeningError) -> Option<Result<SampledFrame, ScreeningError>> {
        self.done = true;
        Some(Err(error))
    }
}

impl Iterator for SampledFrames<'_> {
    type Item = Result<SampledFrame, ScreeningError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let Some(timestamp) = self.take_if_due() else {
                    continue;
                };

                return match self.convert_current_frame() {
                    Ok(image) => {
                        self.yielded += 1;
                        log::debug!("Sampled frame at {}", timestamp.colon());
                        Some(Ok(SampledFrame { timestamp, image }))
                    }
                    Err(error) => self.fail(error),
                };
            }

            if self.eof_sent {
                self.done = true;
                if self.yielded == 0 {
                    return Some(Err(ScreeningError::VideoDecodeError(
                        "No frames could be decoded from the video stream".to_string(),
                    )));
                }
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            return self.fail(error.into());
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return self.fail(error.into());
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::debug!("Skipping unreadable packet: {error}");
                }
            }
        }
    }
}
