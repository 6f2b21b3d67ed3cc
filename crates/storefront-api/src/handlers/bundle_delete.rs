use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::surface::parse_surface;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use storefront_core::models::{DeleteBundleRequest, OkResponse};

/// Delete a bundle; its storage objects are removed best-effort afterwards.
///
/// Served on both `DELETE /{surface}/images` and `POST /{surface}/images/delete`.
#[utoipa::path(
    delete,
    path = "/api/v0/{surface}/images",
    tag = "images",
    params(
        ("surface" = String, Path, description = "products, collections, pages or gallery")
    ),
    request_body = DeleteBundleRequest,
    responses(
        (status = 200, description = "Bundle deleted", body = OkResponse),
        (status = 404, description = "Bundle not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(surface = %surface, bundle_id = %request.bundle_id, operation = "delete_bundle")
)]
pub async fn delete_bundle(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    ValidatedJson(request): ValidatedJson<DeleteBundleRequest>,
) -> Result<Json<OkResponse>, HttpAppError> {
    let surface = parse_surface(&surface)?;
    state.bundles.delete(surface, request.bundle_id).await?;
    Ok(Json(OkResponse::ok()))
}
