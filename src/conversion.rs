//! Frame preparation for upload.
//!
//! The moderation service accepts images no larger than 2048 pixels on
//! either side, so frames are downscaled (aspect ratio preserved) before
//! being JPEG-encoded.

use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};

use crate::error::ScreeningError;

/// Longest side accepted by the moderation service.
pub const MAX_UPLOAD_DIMENSION: u32 = 2048;

const JPEG_QUALITY: u8 = 90;

/// Scale `(width, height)` down to fit within `limit`, keeping the aspect
/// ratio. Sizes already within bounds are returned unchanged.
pub(crate) fn fit_within(width: u32, height: u32, limit: u32) -> (u32, u32) {
    if width <= limit && height <= limit {
        return (width, height);
    }

    let factor = f64::min(
        f64::from(limit) / f64::from(width),
        f64::from(limit) / f64::from(height),
    );
    let scaled_width = (f64::from(width) * factor) as u32;
    let scaled_height = (f64::from(height) * factor) as u32;
    (scaled_width.max(1), scaled_height.max(1))
}

/// Downscale `image` if needed and encode it as JPEG.
///
/// # Errors
///
/// Returns [`ScreeningError::ImageError`] if encoding fails.
pub fn encode_for_upload(image: &DynamicImage) -> Result<Vec<u8>, ScreeningError> {
    let (width, height) = fit_within(image.width(), image.height(), MAX_UPLOAD_DIMENSION);

    let resized;
    let source = if (width, height) == (image.width(), image.height()) {
        image
    } else {
        log::debug!(
            "Downscaling {}x{} frame to {width}x{height}",
            image.width(),
            image.height()
        );
        resized = image.resize_exact(width, height, FilterType::Triangle);
        &resized
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(source.to_rgb8());
    let mut buffer = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    #[test]
    fn small_frames_keep_their_size() {
        assert_eq!(fit_within(1920, 1080, 2048), (1920, 1080));
    }

    #[test]
    fn large_frames_fit_the_limit() {
        assert_eq!(fit_within(4096, 2160, 2048), (2048, 1080));
        assert_eq!(fit_within(1024, 4096, 2048), (512, 2048));
    }

    #[test]
    fn encodes_jpeg() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(16, 8));
        let bytes = encode_for_upload(&image).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
