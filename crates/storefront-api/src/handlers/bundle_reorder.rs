use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::surface::{owner_ref, parse_surface};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use storefront_core::models::{OkResponse, ReorderRequest};
use storefront_core::AppError;
use validator::Validate;

/// Replace the ordering of every bundle of one owner.
///
/// `order` values are sorted ascending to produce the new sequence. The request must name
/// each of the owner's bundles exactly once.
#[utoipa::path(
    post,
    path = "/api/v0/{surface}/images/reorder",
    tag = "images",
    params(
        ("surface" = String, Path, description = "products, collections, pages or gallery")
    ),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Order saved", body = OkResponse),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 409, description = "Ordering is not a permutation of the owner's bundles", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(surface = %surface, operation = "reorder_bundles"))]
pub async fn reorder_bundles(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    ValidatedJson(request): ValidatedJson<ReorderRequest>,
) -> Result<Json<OkResponse>, HttpAppError> {
    let surface = parse_surface(&surface)?;
    request.validate().map_err(AppError::from)?;
    let owner = owner_ref(surface, &request.owner_entity_id)?;

    state
        .bundles
        .reorder(&owner, &request.ordered_ids())
        .await?;
    Ok(Json(OkResponse::ok()))
}
