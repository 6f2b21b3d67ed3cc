//! Variant transcoder
//!
//! Renders one variant of a source image: decode, resize per [`ResizeMode`], then encode
//! as baseline JPEG at the variant quality. Every variant is JPEG whatever the source
//! format, so downstream storage and caching only ever see one content type.

use super::orientation::decode_oriented;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use storefront_core::models::{ResizeMode, VariantSpec};
use storefront_core::AppError;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Transcode failure: {0}")]
    TranscodeFailure(String),
}

impl From<TranscodeError> for AppError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::UnsupportedImageFormat(msg) => AppError::UnsupportedImageFormat(msg),
            TranscodeError::TranscodeFailure(msg) => AppError::TranscodeFailure(msg),
        }
    }
}

/// One encoded variant
#[derive(Debug, Clone)]
pub struct TranscodedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

impl TranscodedImage {
    pub fn content_type(&self) -> &'static str {
        JPEG_CONTENT_TYPE
    }
}

/// Dimensions of `width`x`height` scaled to fit a `max_dimension` square, never enlarged.
pub fn fit_inside(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let ratio = f64::min(
        max_dimension as f64 / width as f64,
        max_dimension as f64 / height as f64,
    );
    let scaled_w = ((width as f64 * ratio).round() as u32).clamp(1, max_dimension);
    let scaled_h = ((height as f64 * ratio).round() as u32).clamp(1, max_dimension);
    (scaled_w, scaled_h)
}

fn resize(img: DynamicImage, spec: &VariantSpec) -> DynamicImage {
    let (width, height) = img.dimensions();
    match spec.resize_mode {
        ResizeMode::Inside => {
            let (target_w, target_h) = fit_inside(width, height, spec.max_dimension);
            if (target_w, target_h) == (width, height) {
                img
            } else {
                img.resize_exact(target_w, target_h, FilterType::Lanczos3)
            }
        }
        ResizeMode::Cover => {
            img.resize_to_fill(spec.max_dimension, spec.max_dimension, FilterType::Lanczos3)
        }
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TranscodeError> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut buffer = Vec::with_capacity((rgb.width() * rgb.height() / 4) as usize);
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| TranscodeError::TranscodeFailure(e.to_string()))?;
    Ok(buffer)
}

/// Transcode `source` into the variant described by `spec`.
pub fn transcode(source: &[u8], spec: &VariantSpec) -> Result<TranscodedImage, TranscodeError> {
    let start = std::time::Instant::now();

    let img = decode_oriented(source)?;
    let (source_w, source_h) = img.dimensions();
    if source_w == 0 || source_h == 0 {
        return Err(TranscodeError::UnsupportedImageFormat(
            "Image has no pixels".to_string(),
        ));
    }

    let resized = resize(img, spec);
    let (width, height) = resized.dimensions();
    let data = encode_jpeg(&resized, spec.quality)?;

    tracing::debug!(
        variant = %spec.name,
        source_width = source_w,
        source_height = source_h,
        width = width,
        height = height,
        size_bytes = data.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Variant transcoded"
    );

    Ok(TranscodedImage {
        data: Bytes::from(data),
        width,
        height,
    })
}
