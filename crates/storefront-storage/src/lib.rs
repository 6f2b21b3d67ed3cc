//! Storefront Storage Library
//!
//! Object storage contract used by the image pipeline, with S3 and local filesystem
//! backends.
//!
//! # Storage key format
//!
//! Every backend stores variants under the same key layout:
//!
//! `{base_path}/{owner_id}/{bundle_id}/{variant}/{timestamp_ms}-{filename}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation and normalization live
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signing::UrlSigner;
pub use storefront_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult, StoredObject, UploadOptions};

use storefront_core::AppError;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object {}", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}
