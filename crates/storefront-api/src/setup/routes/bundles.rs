//! Bundle and media route groups.

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn bundle_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/{{surface}}/images", API_PREFIX),
            get(handlers::bundle_list::list_bundles)
                .post(handlers::bundle_upload::upload_bundle)
                .delete(handlers::bundle_delete::delete_bundle),
        )
        .route(
            &format!("{}/{{surface}}/images/reorder", API_PREFIX),
            post(handlers::bundle_reorder::reorder_bundles),
        )
        .route(
            &format!("{}/{{surface}}/images/delete", API_PREFIX),
            post(handlers::bundle_delete::delete_bundle),
        )
}

pub fn media_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        &format!("{}/media/sign", API_PREFIX),
        post(handlers::media_sign::sign_paths),
    )
}
