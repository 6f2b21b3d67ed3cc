//! Test helpers: build the router against the in-memory repository and local storage.
//!
//! Run with `cargo test -p storefront-api`. No database or Docker needed.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::TestServer;
use std::sync::Arc;
use storefront_api::constants;
use storefront_api::setup::{routes, services};
use storefront_core::models::VariantProfiles;
use storefront_core::{Config, ServerConfig, StorageBackend, StorefrontConfig};
use storefront_db::InMemoryBundleRepository;
use storefront_storage::{LocalStorage, Storage, UrlSigner};
use tempfile::TempDir;

pub const TEST_SIGNING_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const TEST_BASE_URL: &str = "http://localhost:4000/media";

/// API path prefix for tests (e.g. `/api/v0/products/images`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub struct TestApp {
    pub server: TestServer,
    pub storage_root: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of stored files under the storage root
    pub fn stored_file_count(&self) -> usize {
        fn count(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .map(|entry| {
                            let path = entry.path();
                            if path.is_dir() {
                                count(&path)
                            } else {
                                1
                            }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        count(self.storage_root.path())
    }
}

fn test_config(storage_root: &TempDir) -> Config {
    Config(Box::new(StorefrontConfig {
        server: ServerConfig {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 5,
            environment: "test".to_string(),
        },
        database_url: "postgresql://unused@localhost/unused".to_string(),
        storage_backend: Some(StorageBackend::Local),
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: Some(storage_root.path().display().to_string()),
        local_storage_base_url: Some(TEST_BASE_URL.to_string()),
        url_signing_secret: Some(TEST_SIGNING_SECRET.to_string()),
        signed_url_ttl_secs: 600,
        signed_url_cache_ttl_secs: 300,
        signed_url_cache_capacity: 1000,
        sign_batch_size: 10,
        max_file_size_bytes: 2 * 1024 * 1024,
        allowed_extensions: vec!["jpg".into(), "jpeg".into(), "png".into(), "webp".into()],
        allowed_content_types: vec!["image/jpeg".into(), "image/png".into(), "image/webp".into()],
        variant_profiles: VariantProfiles::default(),
    }))
}

pub async fn setup_test_app() -> TestApp {
    let storage_root = TempDir::new().unwrap();
    let config = test_config(&storage_root);

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(
            storage_root.path().display().to_string(),
            TEST_BASE_URL.to_string(),
        )
        .await
        .unwrap()
        .with_signer(UrlSigner::new(TEST_SIGNING_SECRET)),
    );
    let state = services::initialize_services(
        &config,
        Arc::new(InMemoryBundleRepository::new()),
        storage,
        None,
    );
    let router = routes::setup_routes(&config, state).unwrap();

    TestApp {
        server: TestServer::new(router).unwrap(),
        storage_root,
    }
}
