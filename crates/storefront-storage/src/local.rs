use crate::keys::validate_key;
use crate::signing::UrlSigner;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject, UploadOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signer: Option<UrlSigner>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/storefront/media")
    /// * `base_url` - Base URL the API serves files from (e.g., "http://localhost:4000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer: None,
        })
    }

    /// Sign presigned URLs with an HMAC of the key and expiry.
    pub fn with_signer(mut self, signer: UrlSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    fn encode_key(storage_key: &str) -> String {
        storage_key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Generate unsigned URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, Self::encode_key(key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        if !options.upsert && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::AlreadyExists(storage_key.to_string()));
        }

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            content_type = %options.content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredObject {
            path: storage_key.to_string(),
            public_url: Some(self.generate_url(storage_key)),
        })
    }

    async fn download_stream(
        &self,
        storage_key: &str,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>> {
        let path = self.key_to_path(storage_key)?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let key = storage_key.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Local storage stream download error");
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.key_to_path(storage_key)?;
        let url = self.generate_url(storage_key);

        match &self.signer {
            Some(signer) => {
                let expires_at = UrlSigner::expiry_from_now(expires_in);
                let signature = signer.sign(storage_key, expires_at)?;
                Ok(format!(
                    "{}?expires={}&signature={}",
                    url, expires_at, signature
                ))
            }
            None => Ok(url),
        }
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        let encoded = rest.split(['?', '#']).next().unwrap_or(rest);
        let decoded: Vec<String> = encoded
            .split('/')
            .map(|segment| urlencoding::decode(segment).map(|s| s.into_owned()))
            .collect::<Result<_, _>>()
            .ok()?;
        Some(decoded.join("/"))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::keys::to_object_key;
    use tempfile::tempdir;

    const BASE_URL: &str = "http://localhost:4000/media";

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, BASE_URL.to_string()).await.unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_upload_writes_file() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let stored = storage
            .upload(
                "product-images/1/b/thumb/1-test.jpg",
                Bytes::from_static(b"test data"),
                &UploadOptions::jpeg(),
            )
            .await
            .unwrap();

        assert_eq!(stored.path, "product-images/1/b/thumb/1-test.jpg");
        assert!(stored.public_url.unwrap().ends_with("thumb/1-test.jpg"));

        let on_disk = fs::read(dir.path().join(&stored.path)).await.unwrap();
        assert_eq!(on_disk, b"test data");
    }

    #[tokio::test]
    async fn test_upload_without_upsert_rejects_existing_object() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let options = UploadOptions {
            content_type: "image/jpeg".to_string(),
            upsert: false,
        };

        storage
            .upload("a/b.jpg", Bytes::from_static(b"one"), &options)
            .await
            .unwrap();
        let second = storage
            .upload("a/b.jpg", Bytes::from_static(b"two"), &options)
            .await;
        assert!(matches!(second, Err(StorageError::AlreadyExists(_))));

        storage
            .upload("a/b.jpg", Bytes::from_static(b"two"), &UploadOptions::jpeg())
            .await
            .unwrap();
        assert_eq!(fs::read(dir.path().join("a/b.jpg")).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.download_stream("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .get_presigned_url("/etc/passwd", Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.delete("nonexistent/file.jpg").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_stream_download() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .upload(
                "stream/dl.jpg",
                Bytes::from_static(b"stream download test"),
                &UploadOptions::jpeg(),
            )
            .await
            .unwrap();

        let mut stream = storage.download_stream("stream/dl.jpg").await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk_result) = stream.next().await {
            downloaded.extend_from_slice(&chunk_result.unwrap());
        }

        assert_eq!(downloaded, b"stream download test");
    }

    #[tokio::test]
    async fn test_signed_url_carries_expiry_and_signature() {
        let dir = tempdir().unwrap();
        let signer = UrlSigner::new("0123456789abcdef0123456789abcdef");
        let storage = storage(dir.path()).await.with_signer(signer.clone());

        let url = storage
            .get_presigned_url("pages/hero/1/b/full/1-x.jpg", Duration::from_secs(600))
            .await
            .unwrap();

        let (base, query) = url.split_once('?').unwrap();
        assert_eq!(base, format!("{}/pages/hero/1/b/full/1-x.jpg", BASE_URL));

        let mut expires = None;
        let mut signature = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("expires", v)) => expires = Some(v.parse::<u64>().unwrap()),
                Some(("signature", v)) => signature = Some(v.to_string()),
                _ => {}
            }
        }
        assert!(signer
            .verify(
                "pages/hero/1/b/full/1-x.jpg",
                expires.unwrap(),
                &signature.unwrap()
            )
            .is_ok());
    }

    #[tokio::test]
    async fn test_presign_many_keeps_input_order() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let keys = vec!["a/1.jpg".to_string(), "../bad".to_string(), "a/2.jpg".to_string()];

        let results = storage.presign_many(&keys, Duration::from_secs(60)).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().ends_with("a/1.jpg"));
        assert!(results[1].is_err());
        assert!(results[2].as_ref().unwrap().ends_with("a/2.jpg"));
    }

    #[tokio::test]
    async fn test_object_key_normalization() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert_eq!(
            to_object_key("/api/images/product-images/1/a.jpg", &storage).as_deref(),
            Some("product-images/1/a.jpg")
        );
        assert_eq!(
            to_object_key(
                "http://localhost:4000/media/product-images/1/a.jpg?expires=1&signature=ab",
                &storage
            )
            .as_deref(),
            Some("product-images/1/a.jpg")
        );
        assert_eq!(
            to_object_key("product-images/1/a.jpg", &storage).as_deref(),
            Some("product-images/1/a.jpg")
        );
        assert_eq!(to_object_key("https://cdn.example.com/x.jpg", &storage), None);
        assert_eq!(to_object_key("data:image/png;base64,AAAA", &storage), None);
    }
}
