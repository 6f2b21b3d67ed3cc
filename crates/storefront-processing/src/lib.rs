//! Storefront Processing Library
//!
//! CPU-bound parts of the image pipeline: the JPEG transcoder that renders one variant,
//! upload validation and filename sanitizing. Nothing here performs I/O.

pub mod filename;
pub mod image;
pub mod validator;

pub use filename::sanitize_filename;
pub use crate::image::{decode_oriented, fit_inside, transcode, TranscodeError, TranscodedImage};
pub use validator::{MediaValidator, ValidationError};
