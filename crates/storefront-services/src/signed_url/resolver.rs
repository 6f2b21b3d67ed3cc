use super::cache::SignedUrlCache;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use storefront_storage::keys::to_object_key;
use storefront_storage::Storage;

/// How one input reference is turned into a browser-usable URL
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    /// Returned unchanged (`data:` URIs, URLs of other hosts)
    Passthrough,
    /// Object of the configured backend, needs a signed URL
    Sign(String),
    Unresolvable,
}

fn classify(input: &str, storage: &dyn Storage) -> Resolution {
    let trimmed = input.trim();
    if trimmed.starts_with("data:") {
        return Resolution::Passthrough;
    }
    if let Some(key) = to_object_key(trimmed, storage) {
        return Resolution::Sign(key);
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Resolution::Passthrough;
    }
    Resolution::Unresolvable
}

/// Maps stored image paths to short-lived signed URLs.
///
/// Signing happens in fixed-size batches that run concurrently. A path whose signing
/// fails maps to `None`; the rest of the batch is unaffected.
pub struct SignedUrlResolver {
    storage: Arc<dyn Storage>,
    cache: Arc<SignedUrlCache>,
    signing_ttl: Duration,
    batch_size: usize,
}

impl SignedUrlResolver {
    pub fn new(
        storage: Arc<dyn Storage>,
        cache: Arc<SignedUrlCache>,
        signing_ttl: Duration,
        batch_size: usize,
    ) -> Self {
        if cache.ttl() >= signing_ttl {
            tracing::warn!(
                cache_ttl_secs = cache.ttl().as_secs(),
                signing_ttl_secs = signing_ttl.as_secs(),
                "Signed URL cache TTL is not below the signing TTL; cached URLs may be expired"
            );
        }
        Self {
            storage,
            cache,
            signing_ttl,
            batch_size: batch_size.max(1),
        }
    }

    pub fn cache(&self) -> &SignedUrlCache {
        &self.cache
    }

    /// Resolve a single path.
    pub async fn resolve_one(&self, path: &str) -> Option<String> {
        self.resolve(&[path.to_string()])
            .await
            .remove(path)
            .flatten()
    }

    /// Resolve every path, keyed by the input string.
    #[tracing::instrument(skip(self, paths), fields(path_count = paths.len()))]
    pub async fn resolve(&self, paths: &[String]) -> HashMap<String, Option<String>> {
        let start = std::time::Instant::now();
        let mut resolved: HashMap<String, Option<String>> = HashMap::with_capacity(paths.len());
        // object key -> inputs that normalize to it
        let mut pending: HashMap<String, Vec<String>> = HashMap::new();

        let mut seen = HashSet::new();
        for path in paths {
            if !seen.insert(path.as_str()) {
                continue;
            }
            match classify(path, self.storage.as_ref()) {
                Resolution::Passthrough => {
                    resolved.insert(path.clone(), Some(path.trim().to_string()));
                }
                Resolution::Unresolvable => {
                    resolved.insert(path.clone(), None);
                }
                Resolution::Sign(key) => match self.cache.get(&key) {
                    Some(url) => {
                        resolved.insert(path.clone(), Some(url));
                    }
                    None => pending.entry(key).or_default().push(path.clone()),
                },
            }
        }

        let cache_hits = resolved.len();
        if !pending.is_empty() {
            let mut keys: Vec<String> = pending.keys().cloned().collect();
            keys.sort();
            let signed = self.sign_keys(&keys).await;

            for (key, result) in signed {
                if let Some(url) = &result {
                    self.cache.insert(key.clone(), url.clone());
                }
                if let Some(inputs) = pending.remove(&key) {
                    for input in inputs {
                        resolved.insert(input, result.clone());
                    }
                }
            }
        }

        tracing::debug!(
            resolved = resolved.len(),
            without_signing = cache_hits,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Resolved signed URLs"
        );

        resolved
    }

    async fn sign_keys(&self, keys: &[String]) -> Vec<(String, Option<String>)> {
        let batches = keys.chunks(self.batch_size).map(|chunk| async move {
            let results = self.storage.presign_many(chunk, self.signing_ttl).await;
            let mut out = Vec::with_capacity(chunk.len());
            for (i, key) in chunk.iter().enumerate() {
                let url = match results.get(i) {
                    Some(Ok(url)) => Some(url.clone()),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, storage_key = %key, "Failed to sign URL");
                        None
                    }
                    None => {
                        tracing::warn!(storage_key = %key, "Signer returned no URL for key");
                        None
                    }
                };
                out.push((key.clone(), url));
            }
            out
        });

        join_all(batches).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStorage;

    fn resolver(storage: Arc<MemoryStorage>, batch_size: usize) -> SignedUrlResolver {
        SignedUrlResolver::new(
            storage,
            Arc::new(SignedUrlCache::new(100, Duration::from_secs(300))),
            Duration::from_secs(600),
            batch_size,
        )
    }

    #[tokio::test]
    async fn test_partial_signing_failure_yields_null() {
        let storage = Arc::new(MemoryStorage::failing_signing("broken"));
        let resolver = resolver(storage, 10);
        let paths = vec![
            "product-images/1/a/thumb/1-a.jpg".to_string(),
            "product-images/1/b/broken/1-b.jpg".to_string(),
            "product-images/1/c/thumb/1-c.jpg".to_string(),
        ];

        let urls = resolver.resolve(&paths).await;

        assert_eq!(urls.len(), 3);
        assert!(urls[&paths[0]].as_deref().unwrap().starts_with("https://signed.test/"));
        assert_eq!(urls[&paths[1]], None);
        assert!(urls[&paths[2]].is_some());
    }

    #[tokio::test]
    async fn test_keys_are_signed_in_batches() {
        let storage = Arc::new(MemoryStorage::new());
        let resolver = resolver(storage.clone(), 10);
        let paths: Vec<String> = (0..25).map(|i| format!("media-library/g/{}.jpg", i)).collect();

        let urls = resolver.resolve(&paths).await;

        assert_eq!(urls.len(), 25);
        assert!(urls.values().all(|u| u.is_some()));
        let mut batches = storage.presign_batches();
        batches.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(batches, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn test_cached_urls_are_not_signed_again() {
        let storage = Arc::new(MemoryStorage::new());
        let resolver = resolver(storage.clone(), 10);
        let paths = vec!["pages/hero/home/b/full/1-a.jpg".to_string()];

        let first = resolver.resolve(&paths).await;
        let second = resolver.resolve(&paths).await;

        assert_eq!(first, second);
        assert_eq!(storage.presign_batches(), vec![1]);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_proxy_and_bucket_urls_normalize_to_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let resolver = resolver(storage.clone(), 10);
        let paths = vec![
            "/api/images/product-images/9/b/thumb/1-x.jpg".to_string(),
            "https://bucket.test/product-images/9/b/thumb/1-x.jpg".to_string(),
            "product-images/9/b/thumb/1-x.jpg".to_string(),
        ];

        let urls = resolver.resolve(&paths).await;

        let expected = "https://signed.test/product-images/9/b/thumb/1-x.jpg?ttl=600";
        for path in &paths {
            assert_eq!(urls[path].as_deref(), Some(expected));
        }
        assert_eq!(storage.presign_batches(), vec![1]);
    }

    #[tokio::test]
    async fn test_data_uris_and_foreign_urls_pass_through() {
        let storage = Arc::new(MemoryStorage::new());
        let resolver = resolver(storage.clone(), 10);
        let data_uri = "data:image/png;base64,iVBORw0KGgo=".to_string();
        let foreign = "https://cdn.example.com/logo.png".to_string();
        let blank = "   ".to_string();

        let urls = resolver
            .resolve(&[data_uri.clone(), foreign.clone(), blank.clone()])
            .await;

        assert_eq!(urls[&data_uri].as_deref(), Some(data_uri.as_str()));
        assert_eq!(urls[&foreign].as_deref(), Some(foreign.as_str()));
        assert_eq!(urls[&blank], None);
        assert!(storage.presign_batches().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_one() {
        let storage = Arc::new(MemoryStorage::failing_signing("bad"));
        let resolver = resolver(storage, 10);
        assert!(resolver.resolve_one("a/ok.jpg").await.is_some());
        assert!(resolver.resolve_one("a/bad.jpg").await.is_none());
    }
}
