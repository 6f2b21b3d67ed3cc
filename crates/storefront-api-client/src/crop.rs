//! Client-side crop pre-processor.
//!
//! The operator picks an aspect ratio and a pixel rectangle; the cropped raster (not the
//! original file) is what gets uploaded. All failures surface here, before any request
//! is made, so a bad crop never creates server-side state.

use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use storefront_processing::decode_oriented;
use thiserror::Error;

/// JPEG quality of the cropped upload
pub const CROP_JPEG_QUALITY: u8 = 92;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    #[error("Crop rectangle is empty")]
    EmptyCrop,

    #[error("Crop rectangle {rect} exceeds image bounds {width}x{height}")]
    OutOfBounds {
        rect: PixelCrop,
        width: u32,
        height: u32,
    },

    #[error("Failed to encode cropped image: {0}")]
    Encode(String),

    #[error("Unsupported aspect ratio '{0}' (expected 1:1, 3:1, 4:3 or 16:9)")]
    UnsupportedRatio(String),
}

/// Aspect ratios offered by the crop dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1
    Square,
    /// 3:1
    Banner,
    /// 4:3
    Classic,
    /// 16:9
    Wide,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::Square,
        AspectRatio::Banner,
        AspectRatio::Classic,
        AspectRatio::Wide,
    ];

    /// `(width, height)` proportions
    pub fn proportions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Banner => (3, 1),
            AspectRatio::Classic => (4, 3),
            AspectRatio::Wide => (16, 9),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1:1" => Ok(AspectRatio::Square),
            "3:1" => Ok(AspectRatio::Banner),
            "4:3" => Ok(AspectRatio::Classic),
            "16:9" => Ok(AspectRatio::Wide),
            other => Err(CropError::UnsupportedRatio(other.to_string())),
        }
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let (w, h) = self.proportions();
        write!(f, "{}:{}", w, h)
    }
}

/// Crop rectangle in source pixels, after EXIF orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelCrop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelCrop {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn fits_within(&self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

impl Display for PixelCrop {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// How the upload path treats the selected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropMode {
    /// Crop to `ratio`; `None` uses the largest centered box.
    Cropped(AspectRatio, Option<PixelCrop>),
    /// Forward the original bytes untouched (gallery and bulk uploads).
    Verbatim,
}

/// Largest box of `ratio` centered in a `width` x `height` image.
pub fn largest_centered(width: u32, height: u32, ratio: AspectRatio) -> PixelCrop {
    let (rw, rh) = ratio.proportions();
    let (rw, rh) = (u64::from(rw), u64::from(rh));
    let (w, h) = (u64::from(width), u64::from(height));

    let (crop_w, crop_h) = if w * rh <= h * rw {
        (w, w * rh / rw)
    } else {
        (h * rw / rh, h)
    };

    // Both fit in u32 since they never exceed the source dimensions.
    let (crop_w, crop_h) = (crop_w as u32, crop_h as u32);
    PixelCrop::new(
        (width - crop_w) / 2,
        (height - crop_h) / 2,
        crop_w,
        crop_h,
    )
}

/// Crop `source` and re-encode it as JPEG.
///
/// Without an explicit `rect` the largest centered box of `ratio` is used. An explicit
/// rect is taken as drawn; the crop dialog already constrains it to the ratio.
pub fn crop(
    source: &[u8],
    ratio: AspectRatio,
    rect: Option<PixelCrop>,
) -> Result<Vec<u8>, CropError> {
    let img = decode_oriented(source).map_err(|e| CropError::Decode(e.to_string()))?;
    let (width, height) = img.dimensions();

    let rect = rect.unwrap_or_else(|| largest_centered(width, height, ratio));
    if rect.width == 0 || rect.height == 0 {
        return Err(CropError::EmptyCrop);
    }
    if !rect.fits_within(width, height) {
        return Err(CropError::OutOfBounds {
            rect,
            width,
            height,
        });
    }

    let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height).to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, CROP_JPEG_QUALITY);
    cropped
        .write_with_encoder(encoder)
        .map_err(|e| CropError::Encode(e.to_string()))?;

    tracing::debug!(
        ratio = %ratio,
        rect = %rect,
        source_bytes = source.len(),
        cropped_bytes = buffer.len(),
        "Cropped image"
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_parse_ratios() {
        for ratio in AspectRatio::ALL {
            assert_eq!(ratio.to_string().parse::<AspectRatio>().unwrap(), ratio);
        }
        assert!(matches!(
            "2:1".parse::<AspectRatio>(),
            Err(CropError::UnsupportedRatio(_))
        ));
    }

    #[test]
    fn test_largest_centered() {
        assert_eq!(
            largest_centered(800, 600, AspectRatio::Square),
            PixelCrop::new(100, 0, 600, 600)
        );
        assert_eq!(
            largest_centered(900, 900, AspectRatio::Banner),
            PixelCrop::new(0, 300, 900, 300)
        );
        assert_eq!(
            largest_centered(1600, 900, AspectRatio::Wide),
            PixelCrop::new(0, 0, 1600, 900)
        );
        assert_eq!(
            largest_centered(400, 400, AspectRatio::Classic),
            PixelCrop::new(0, 50, 400, 300)
        );
    }

    #[test]
    fn test_crop_default_box() {
        let out = crop(&jpeg(800, 600), AspectRatio::Square, None).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (600, 600));
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_crop_explicit_rect() {
        let rect = PixelCrop::new(10, 20, 160, 90);
        let out = crop(&jpeg(400, 300), AspectRatio::Wide, Some(rect)).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.dimensions(), (160, 90));
    }

    #[test]
    fn test_crop_png_source_encodes_jpeg() {
        let img = RgbImage::from_pixel(320, 240, Rgb([0, 90, 30]));
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();

        let out = crop(png.get_ref(), AspectRatio::Wide, None).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let cropped = image::load_from_memory(&out).unwrap();
        assert_eq!(cropped.dimensions(), (320, 180));
    }

    #[test]
    fn test_crop_failures() {
        let source = jpeg(100, 100);
        assert!(matches!(
            crop(&source, AspectRatio::Square, Some(PixelCrop::new(0, 0, 0, 10))),
            Err(CropError::EmptyCrop)
        ));
        assert!(matches!(
            crop(&source, AspectRatio::Square, Some(PixelCrop::new(50, 50, 60, 60))),
            Err(CropError::OutOfBounds { .. })
        ));
        assert!(matches!(
            crop(b"not an image", AspectRatio::Square, None),
            Err(CropError::Decode(_))
        ));
    }
}
