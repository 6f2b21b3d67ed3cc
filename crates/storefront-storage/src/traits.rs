//! Storage abstraction trait
//!
//! This module defines the object storage contract the image pipeline depends on.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Options attached to an upload
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub content_type: String,
    /// Overwrite an existing object at the same key
    pub upsert: bool,
}

impl UploadOptions {
    pub fn jpeg() -> Self {
        Self {
            content_type: "image/jpeg".to_string(),
            upsert: true,
        }
    }
}

/// Location of an uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    /// Unsigned URL, only meaningful for public buckets
    pub public_url: Option<String>,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait. Keys are
/// slash-separated relative paths; they must not contain `..` or start with `/`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a buffer to `storage_key`
    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject>;

    /// Download a file as a stream of chunks
    async fn download_stream(
        &self,
        storage_key: &str,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>>;

    /// Delete a file by its storage key. Deleting a missing key succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Generate a time-limited GET URL for a private object
    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Sign several keys at once. The result has one entry per input key, in order.
    ///
    /// Backends with a bulk signer override this; the default signs each key concurrently.
    async fn presign_many(
        &self,
        storage_keys: &[String],
        expires_in: Duration,
    ) -> Vec<StorageResult<String>> {
        futures::future::join_all(
            storage_keys
                .iter()
                .map(|key| self.get_presigned_url(key, expires_in)),
        )
        .await
    }

    /// Map a URL pointing at this backend back to its object key
    fn key_from_url(&self, _url: &str) -> Option<String> {
        None
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
