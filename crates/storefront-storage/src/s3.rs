use crate::keys::{split_url, validate_key};
use crate::traits::{Storage, StorageError, StorageResult, StoredObject, UploadOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutMode, PutOptions,
    PutPayload, Result as ObjectResult,
};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    /// Generate unsigned URL for an S3 object
    ///
    /// Path-style `{endpoint}/{bucket}/{key}` for S3-compatible providers, virtual-hosted
    /// style for AWS.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn location(storage_key: &str) -> StorageResult<Path> {
        validate_key(storage_key)?;
        Ok(Path::from(storage_key.to_string()))
    }
}

/// Sign each key on its own so one bad key cannot fail the rest.
async fn sign_individually<F, Fut>(keys: Vec<String>, sign: F) -> Vec<StorageResult<String>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = StorageResult<String>>,
{
    futures::future::join_all(keys.into_iter().map(sign)).await
}

/// Recover the object key from an S3 URL of `bucket`.
///
/// Understands virtual-hosted (`{bucket}.s3[.{region}].amazonaws.com/{key}`) and path-style
/// (`s3[.{region}].amazonaws.com/{bucket}/{key}` or `{endpoint}/{bucket}/{key}`) URLs. Query
/// strings from earlier signatures are dropped.
pub fn key_from_s3_url(url: &str, bucket: &str, endpoint: Option<&str>) -> Option<String> {
    let (host, path) = split_url(url)?;

    let encoded = if let Some(endpoint) = endpoint {
        let (endpoint_host, endpoint_path) = split_url(endpoint)?;
        let prefix = endpoint_path.trim_end_matches('/');
        if !host.eq_ignore_ascii_case(endpoint_host) {
            return None;
        }
        let path = if prefix.is_empty() {
            path
        } else {
            path.strip_prefix(prefix)?.trim_start_matches('/')
        };
        path.strip_prefix(bucket)?.strip_prefix('/')?
    } else {
        let host = host.to_ascii_lowercase();
        if !host.ends_with(".amazonaws.com") {
            return None;
        }
        let virtual_prefix = format!("{}.s3", bucket.to_ascii_lowercase());
        if host.starts_with(&virtual_prefix) {
            path
        } else if host.starts_with("s3.") || host.starts_with("s3-") {
            path.strip_prefix(bucket)?.strip_prefix('/')?
        } else {
            return None;
        }
    };

    let segments = encoded
        .split('/')
        .map(|segment| urlencoding::decode(segment).map(|s| s.into_owned()))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    let key = segments.join("/");
    (!key.is_empty()).then_some(key)
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> StorageResult<StoredObject> {
        let location = Self::location(storage_key)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(options.content_type.clone()),
        );
        let put_options = PutOptions {
            mode: if options.upsert {
                PutMode::Overwrite
            } else {
                PutMode::Create
            },
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), put_options)
            .await;

        result.map_err(|e| match e {
            ObjectStoreError::AlreadyExists { .. } => {
                StorageError::AlreadyExists(storage_key.to_string())
            }
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(other.to_string())
            }
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %options.content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
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
        let start = std::time::Instant::now();
        let location = Self::location(storage_key)?;

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        let bucket = self.bucket.clone();
        let key = storage_key.to_string();

        let stream = result.into_stream().map(move |res| match res {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                Err(StorageError::DownloadFailed(e.to_string()))
            }
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Self::location(storage_key)?;

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let location = Self::location(storage_key)?;
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?
            .to_string();

        Ok(url)
    }

    async fn presign_many(
        &self,
        storage_keys: &[String],
        expires_in: Duration,
    ) -> Vec<StorageResult<String>> {
        let mut results: Vec<Option<StorageResult<String>>> =
            Vec::with_capacity(storage_keys.len());
        let mut valid = Vec::new();
        let mut locations = Vec::new();

        for (index, key) in storage_keys.iter().enumerate() {
            match Self::location(key) {
                Ok(location) => {
                    results.push(None);
                    valid.push(index);
                    locations.push(location);
                }
                Err(e) => results.push(Some(Err(e))),
            }
        }

        if !locations.is_empty() {
            let signed: ObjectResult<_> = self
                .store
                .signed_urls(Method::GET, &locations, expires_in)
                .await;

            let batch_error = match signed {
                Ok(urls) if urls.len() == valid.len() => {
                    for (index, url) in valid.iter().zip(urls) {
                        results[*index] = Some(Ok(url.to_string()));
                    }
                    None
                }
                Ok(urls) => Some(format!(
                    "Signer returned {} URLs for {} keys",
                    urls.len(),
                    valid.len()
                )),
                Err(e) => Some(e.to_string()),
            };

            if let Some(error) = batch_error {
                tracing::warn!(
                    error = %error,
                    bucket = %self.bucket,
                    key_count = valid.len(),
                    "S3 batch signing failed, signing keys individually"
                );
                let keys = valid.iter().map(|index| storage_keys[*index].clone()).collect();
                let signed = sign_individually(keys, |key| async move {
                    self.get_presigned_url(&key, expires_in).await
                })
                .await;
                for (index, result) in valid.iter().zip(signed) {
                    results[*index] = Some(result);
                }
            }
        }

        results
            .into_iter()
            .map(|r| {
                r.unwrap_or_else(|| Err(StorageError::SigningFailed("Key was not signed".into())))
            })
            .collect()
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        key_from_s3_url(url, &self.bucket, self.endpoint_url.as_deref())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
