//! Service wiring: cache, resolver, validator and bundle service.

use crate::state::AppState;
use sqlx::PgPool;
use std::sync::Arc;
use storefront_core::{Config, StorageBackend};
use storefront_db::BundleRepository;
use storefront_processing::MediaValidator;
use storefront_services::{BundleService, SignedUrlCache, SignedUrlResolver};
use storefront_storage::{Storage, UrlSigner};

pub fn initialize_services(
    config: &Config,
    repository: Arc<dyn BundleRepository>,
    storage: Arc<dyn Storage>,
    pool: Option<PgPool>,
) -> Arc<AppState> {
    let cache = Arc::new(SignedUrlCache::new(
        config.signed_url_cache_capacity(),
        config.signed_url_cache_ttl(),
    ));
    let resolver = Arc::new(SignedUrlResolver::new(
        storage.clone(),
        cache,
        config.signed_url_ttl(),
        config.sign_batch_size(),
    ));
    tracing::info!(
        cache_capacity = config.signed_url_cache_capacity(),
        cache_ttl_secs = config.signed_url_cache_ttl().as_secs(),
        signing_ttl_secs = config.signed_url_ttl().as_secs(),
        batch_size = config.sign_batch_size(),
        "Signed URL resolver initialized"
    );

    let validator = MediaValidator::new(
        config.max_file_size_bytes(),
        config.allowed_extensions().to_vec(),
        config.allowed_content_types().to_vec(),
    );

    let bundles = Arc::new(BundleService::new(
        repository,
        storage.clone(),
        resolver,
        config.variant_profiles().clone(),
        validator,
    ));

    let url_signer = match storage.backend_type() {
        StorageBackend::Local => config.url_signing_secret().map(UrlSigner::new),
        StorageBackend::S3 => None,
    };

    Arc::new(AppState {
        config: config.clone(),
        bundles,
        storage,
        url_signer,
        pool,
    })
}
