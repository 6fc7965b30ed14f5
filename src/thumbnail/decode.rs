use std::path::Path;

use image::{ImageReader, RgbaImage, imageops::FilterType};

use crate::error::ClipError;
use crate::scheduler::CancellationToken;

/// Default decode width for grid cells. Full-size captures are far too large
/// to keep resident for hundreds of cells.
pub const DEFAULT_DECODE_WIDTH: u32 = 320;

/// Decodes a thumbnail file scaled down to a target width.
///
/// Called off the presentation thread. Implementations should check the
/// token between expensive steps and return `ClipError::Cancelled` once it
/// fires.
pub trait ThumbnailDecoder: Send + Sync {
    fn decode_scaled(
        &self,
        path: &Path,
        target_width: u32,
        token: &CancellationToken,
    ) -> Result<RgbaImage, ClipError>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ThumbnailDecoder for ImageDecoder {
    fn decode_scaled(
        &self,
        path: &Path,
        target_width: u32,
        token: &CancellationToken,
    ) -> Result<RgbaImage, ClipError> {
        token.check()?;
        if !path.is_file() {
            return Err(ClipError::ThumbnailMissing(path.to_path_buf()));
        }

        let img = ImageReader::open(path)
            .map_err(|e| ClipError::DecodeFailed {
                path: path.to_path_buf(),
                source: e.into(),
            })?
            .with_guessed_format()
            .map_err(|e| ClipError::DecodeFailed {
                path: path.to_path_buf(),
                source: e.into(),
            })?
            .decode()
            .map_err(|e| ClipError::DecodeFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        token.check()?;
        Ok(scale_to_width(img.into_rgba8(), target_width))
    }
}

/// Downscale to `target_width`, preserving aspect ratio. Never upscales.
pub fn scale_to_width(img: RgbaImage, target_width: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || target_width == 0 || w <= target_width {
        return img;
    }

    let scale = target_width as f32 / w as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_height = ((h as f32 * scale).round() as u32).max(1);

    image::imageops::resize(&img, target_width, new_height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_to_width_preserves_aspect() {
        let img = RgbaImage::new(1920, 1080);
        let scaled = scale_to_width(img, 320);
        assert_eq!(scaled.dimensions(), (320, 180));
    }

    #[test]
    fn test_scale_to_width_never_upscales() {
        let img = RgbaImage::new(200, 100);
        let scaled = scale_to_width(img, 320);
        assert_eq!(scaled.dimensions(), (200, 100));
    }

    #[test]
    fn test_decode_scaled_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        RgbaImage::new(640, 360).save(&path).unwrap();

        let img = ImageDecoder
            .decode_scaled(&path, 320, &CancellationToken::new())
            .unwrap();
        assert_eq!(img.dimensions(), (320, 180));
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageDecoder
            .decode_scaled(&dir.path().join("nope.jpg"), 320, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ClipError::ThumbnailMissing(_)));
    }

    #[test]
    fn test_decode_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = ImageDecoder
            .decode_scaled(&path, 320, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, ClipError::DecodeFailed { .. }));
    }

    #[test]
    fn test_decode_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        RgbaImage::new(64, 64).save(&path).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = ImageDecoder.decode_scaled(&path, 320, &token).unwrap_err();
        assert!(err.is_cancelled());
    }
}
