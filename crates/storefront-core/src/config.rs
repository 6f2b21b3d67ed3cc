//! Configuration module
//!
//! This module provides configuration structures for the API server: database,
//! storage, URL signing, upload limits and the variant profiles each admin surface uses.

use std::env;
use std::path::Path;
use std::time::Duration;

use crate::models::VariantProfiles;
use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 10;
const SIGNED_URL_TTL_SECS: u64 = 600;
const SIGNED_URL_CACHE_TTL_SECS: u64 = 300;
const SIGNED_URL_CACHE_CAPACITY: usize = 10_000;
const SIGN_BATCH_SIZE: usize = 10;

/// Path the API serves signed local objects under; `LOCAL_STORAGE_BASE_URL` must end here.
pub const LOCAL_MEDIA_ROUTE: &str = "/media";

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Image pipeline configuration
#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    pub server: ServerConfig,
    pub database_url: String,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, R2, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub url_signing_secret: Option<String>,
    // Signed URL resolution
    pub signed_url_ttl_secs: u64,
    pub signed_url_cache_ttl_secs: u64,
    pub signed_url_cache_capacity: usize,
    pub sign_batch_size: usize,
    // Upload validation
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub variant_profiles: VariantProfiles,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<StorefrontConfig>);

impl Config {
    fn as_storefront(&self) -> &StorefrontConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_storefront().server.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = StorefrontConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_storefront().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_storefront().server.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_storefront().server.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_storefront().server.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_storefront().server.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_storefront().server.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.as_storefront().database_url
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.as_storefront().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_storefront().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_storefront().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_storefront().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_storefront().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_storefront().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_storefront().local_storage_base_url.as_deref()
    }

    pub fn url_signing_secret(&self) -> Option<&str> {
        self.as_storefront().url_signing_secret.as_deref()
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.as_storefront().signed_url_ttl_secs)
    }

    pub fn signed_url_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.as_storefront().signed_url_cache_ttl_secs)
    }

    pub fn signed_url_cache_capacity(&self) -> usize {
        self.as_storefront().signed_url_cache_capacity
    }

    pub fn sign_batch_size(&self) -> usize {
        self.as_storefront().sign_batch_size
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.as_storefront().max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.as_storefront().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_storefront().allowed_content_types
    }

    pub fn variant_profiles(&self) -> &VariantProfiles {
        &self.as_storefront().variant_profiles
    }
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let server = ServerConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => Some(value.parse::<StorageBackend>()?),
            Err(_) => None,
        };

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let variant_profiles = match env::var("VARIANT_PROFILES_PATH") {
            Ok(path) if !path.trim().is_empty() => load_variant_profiles(Path::new(&path))?,
            _ => VariantProfiles::default(),
        };

        let config = StorefrontConfig {
            server,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            url_signing_secret: env::var("URL_SIGNING_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            signed_url_ttl_secs: env::var("SIGNED_URL_TTL_SECS")
                .unwrap_or_else(|_| SIGNED_URL_TTL_SECS.to_string())
                .parse()
                .unwrap_or(SIGNED_URL_TTL_SECS),
            signed_url_cache_ttl_secs: env::var("SIGNED_URL_CACHE_TTL_SECS")
                .unwrap_or_else(|_| SIGNED_URL_CACHE_TTL_SECS.to_string())
                .parse()
                .unwrap_or(SIGNED_URL_CACHE_TTL_SECS),
            signed_url_cache_capacity: env::var("SIGNED_URL_CACHE_CAPACITY")
                .unwrap_or_else(|_| SIGNED_URL_CACHE_CAPACITY.to_string())
                .parse()
                .unwrap_or(SIGNED_URL_CACHE_CAPACITY),
            sign_batch_size: env::var("SIGN_BATCH_SIZE")
                .unwrap_or_else(|_| SIGN_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(SIGN_BATCH_SIZE),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_extensions: env_list("ALLOWED_EXTENSIONS", "jpg,jpeg,png,gif,webp"),
            allowed_content_types: env_list(
                "ALLOWED_CONTENT_TYPES",
                "image/jpeg,image/png,image/gif,image/webp",
            ),
            variant_profiles,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("SIGNED_URL_TTL_SECS must be greater than 0"));
        }

        if self.signed_url_cache_ttl_secs >= self.signed_url_ttl_secs {
            return Err(anyhow::anyhow!(
                "SIGNED_URL_CACHE_TTL_SECS ({}) must be lower than SIGNED_URL_TTL_SECS ({})",
                self.signed_url_cache_ttl_secs,
                self.signed_url_ttl_secs
            ));
        }

        if self.sign_batch_size == 0 {
            return Err(anyhow::anyhow!("SIGN_BATCH_SIZE must be greater than 0"));
        }

        self.variant_profiles
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid variant profiles: {}", e))?;

        // Validate storage backend configuration
        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                let Some(base_url) = self.local_storage_base_url.as_deref() else {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                };
                if url_path(base_url).trim_end_matches('/') != LOCAL_MEDIA_ROUTE {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must point at the server's {} route, got {}",
                        LOCAL_MEDIA_ROUTE,
                        base_url
                    ));
                }
                match self.url_signing_secret.as_deref() {
                    Some(secret) if secret.len() >= 32 => {}
                    _ => {
                        return Err(anyhow::anyhow!(
                            "URL_SIGNING_SECRET must be at least 32 characters when using local storage backend"
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Path component of an absolute URL, without query or fragment.
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    rest.find('/').map_or("", |i| &rest[i..])
}

/// Load variant profiles from a JSON file, replacing the built-in set.
pub fn load_variant_profiles(path: &Path) -> Result<VariantProfiles, anyhow::Error> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read VARIANT_PROFILES_PATH {}: {}",
            path.display(),
            e
        )
    })?;
    let profiles: VariantProfiles = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    Ok(profiles)
}
