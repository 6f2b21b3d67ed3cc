//! Application setup and initialization
//!
//! Wiring kept out of main.rs so tests can build the same router against in-memory
//! dependencies.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::Result;
use std::sync::Arc;
use storefront_core::Config;
use storefront_db::PgBundleRepository;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.environment());
    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let repository = Arc::new(PgBundleRepository::new(pool.clone()));
    let state = services::initialize_services(&config, repository, storage, Some(pool));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
