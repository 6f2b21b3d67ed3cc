//! Storefront Services Layer
//!
//! Orchestrates the image pipeline: variant building, bundle lifecycle and signed-URL
//! resolution. HTTP handlers in storefront-api stay thin and call into this crate.

pub mod builder;
pub mod bundle_service;
pub mod cleanup;
pub mod signed_url;

#[cfg(test)]
mod test_support;

pub use builder::{BuildRequest, VariantSetBuilder};
pub use bundle_service::{BundleService, UploadRequest};
pub use cleanup::delete_objects_best_effort;
pub use signed_url::{SignedUrlCache, SignedUrlResolver};
