//! Data models for the image pipeline
//!
//! Each sub-module represents one concept: variant specs and profiles, the admin
//! surfaces that own images, and persisted bundles with their HTTP DTOs.

mod bundle;
mod surface;
mod variant;

pub use bundle::*;
pub use surface::*;
pub use variant::*;
