use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::surface::{owner_ref, parse_surface};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use std::sync::Arc;
use storefront_core::models::{ListBundlesQuery, ListBundlesResponse};

/// Bundles of one owner in display order, each variant with a signed URL.
#[utoipa::path(
    get,
    path = "/api/v0/{surface}/images",
    tag = "images",
    params(
        ("surface" = String, Path, description = "products, collections, pages or gallery"),
        ("ownerEntityId" = String, Query, description = "Owner entity id")
    ),
    responses(
        (status = 200, description = "Bundles in position order", body = ListBundlesResponse),
        (status = 400, description = "Missing ownerEntityId", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(surface = %surface, operation = "list_bundles"))]
pub async fn list_bundles(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    query: Result<Query<ListBundlesQuery>, QueryRejection>,
) -> Result<Json<ListBundlesResponse>, HttpAppError> {
    let surface = parse_surface(&surface)?;
    let Query(query) = query?;
    let owner = owner_ref(surface, &query.owner_entity_id)?;

    let response = state.bundles.list(&owner).await?;
    Ok(Json(response))
}
