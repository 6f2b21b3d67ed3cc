use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;
use storefront_core::models::{SignRequest, SignResponse};
use storefront_core::AppError;
use validator::Validate;

/// Resolve stored image paths to signed URLs; paths that cannot be signed map to `null`.
#[utoipa::path(
    post,
    path = "/api/v0/media/sign",
    tag = "media",
    request_body = SignRequest,
    responses(
        (status = 200, description = "Signed URL per path", body = SignResponse),
        (status = 400, description = "Invalid request body", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(path_count = request.paths.len(), operation = "sign_paths"))]
pub async fn sign_paths(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignRequest>,
) -> Result<Json<SignResponse>, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    Ok(Json(state.bundles.sign(&request.paths).await))
}
