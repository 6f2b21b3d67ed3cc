use super::transcoder::TranscodeError;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

/// Decode an image buffer and apply its EXIF orientation.
///
/// Camera uploads often store pixels sideways with an orientation tag; variants are
/// re-encoded without metadata, so the rotation has to be baked into the pixels.
pub fn decode_oriented(data: &[u8]) -> Result<DynamicImage, TranscodeError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TranscodeError::UnsupportedImageFormat(e.to_string()))?;

    if reader.format().is_none() {
        return Err(TranscodeError::UnsupportedImageFormat(
            "Unrecognized image data".to_string(),
        ));
    }

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| TranscodeError::UnsupportedImageFormat(e.to_string()))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut img = DynamicImage::from_decoder(decoder)
        .map_err(|e| TranscodeError::UnsupportedImageFormat(e.to_string()))?;

    if orientation != Orientation::NoTransforms {
        tracing::debug!(orientation = ?orientation, "Applying EXIF orientation");
        img.apply_orientation(orientation);
    }

    Ok(img)
}
