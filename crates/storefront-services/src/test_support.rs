//! In-memory storage with failure injection for service tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;
use storefront_storage::{
    Storage, StorageBackend, StorageError, StorageResult, StoredObject, UploadOptions,
};

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    /// Uploads whose key contains this fragment fail
    fail_uploads_containing: Option<String>,
    /// Signing of keys containing this fragment fails
    fail_signing_containing: Option<String>,
    fail_deletes: bool,
    presign_calls: Mutex<Vec<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_uploads(fragment: &str) -> Self {
        Self {
            fail_uploads_containing: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_signing(fragment: &str) -> Self {
        Self {
            fail_signing_containing: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Sizes of the batches passed to `presign_many`
    pub fn presign_batches(&self) -> Vec<usize> {
        self.presign_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        _options: &UploadOptions,
    ) -> StorageResult<StoredObject> {
        if let Some(fragment) = &self.fail_uploads_containing {
            if storage_key.contains(fragment.as_str()) {
                // Let sibling uploads land first so cleanup has something to remove
                tokio::time::sleep(Duration::from_millis(20)).await;
                return Err(StorageError::UploadFailed(format!(
                    "injected failure for {}",
                    storage_key
                )));
            }
        }
        self.objects
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), data);
        Ok(StoredObject {
            path: storage_key.to_string(),
            public_url: None,
        })
    }

    async fn download_stream(
        &self,
        storage_key: &str,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>> {
        let data = self
            .object(storage_key)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.fail_deletes {
            return Err(StorageError::DeleteFailed("injected failure".to_string()));
        }
        self.objects.lock().unwrap().remove(storage_key);
        Ok(())
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if let Some(fragment) = &self.fail_signing_containing {
            if storage_key.contains(fragment.as_str()) {
                return Err(StorageError::SigningFailed("injected failure".to_string()));
            }
        }
        Ok(format!(
            "https://signed.test/{}?ttl={}",
            storage_key,
            expires_in.as_secs()
        ))
    }

    async fn presign_many(
        &self,
        storage_keys: &[String],
        expires_in: Duration,
    ) -> Vec<StorageResult<String>> {
        self.presign_calls.lock().unwrap().push(storage_keys.len());
        let mut out = Vec::with_capacity(storage_keys.len());
        for key in storage_keys {
            out.push(self.get_presigned_url(key, expires_in).await);
        }
        out
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix("https://bucket.test/").map(String::from)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// JPEG source image of the given size
pub fn sample_jpeg(width: u32, height: u32) -> Bytes {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, 90])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    Bytes::from(buf)
}
