//! Application state shared by every handler.

use sqlx::PgPool;
use std::sync::Arc;
use storefront_core::Config;
use storefront_services::BundleService;
use storefront_storage::{Storage, UrlSigner};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub bundles: Arc<BundleService>,
    pub storage: Arc<dyn Storage>,
    /// Verifies signed local media URLs; `None` unless the local backend is in use
    pub url_signer: Option<UrlSigner>,
    /// `None` when running against the in-memory repository
    pub pool: Option<PgPool>,
}
