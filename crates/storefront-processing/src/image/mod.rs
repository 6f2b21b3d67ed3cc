//! Image processing module
//!
//! - EXIF-aware decoding (orientation)
//! - Variant transcoding to JPEG (transcoder)

pub mod orientation;
pub mod transcoder;

pub use orientation::decode_oriented;
pub use transcoder::{fit_inside, transcode, TranscodeError, TranscodedImage};
