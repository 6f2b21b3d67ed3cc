use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::surface::{owner_ref, parse_surface};
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use std::sync::Arc;
use storefront_core::models::UploadBundleResponse;
use storefront_core::AppError;
use storefront_services::UploadRequest;

/// Fields of the upload form
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Bytes>,
    filename: Option<String>,
    content_type: Option<String>,
    owner_entity_id: Option<String>,
    position: Option<i32>,
}

/// Body-limit failures surface as 413; everything else is a malformed form.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("Upload exceeds the maximum request size: {}", err))
    } else {
        AppError::InvalidInput(format!("{}: {}", context, err))
    }
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match field_name.as_str() {
            "file" => {
                if form.file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                form.filename = field.file_name().map(|s: &str| s.to_string());
                form.content_type = field.content_type().map(|s: &str| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read file data", e))?;
                form.file = Some(data);
            }
            "ownerEntityId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read ownerEntityId", e))?;
                form.owner_entity_id = Some(text);
            }
            "position" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Failed to read position", e))?;
                let text = text.trim();
                if !text.is_empty() {
                    let position = text.parse::<i32>().map_err(|_| {
                        AppError::InvalidInput(format!("position must be an integer, got '{}'", text))
                    })?;
                    form.position = Some(position);
                }
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

/// Upload one image and store all variants of its surface's profile as a new bundle.
#[utoipa::path(
    post,
    path = "/api/v0/{surface}/images",
    tag = "images",
    params(
        ("surface" = String, Path, description = "products, collections, pages or gallery")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Bundle created", body = UploadBundleResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Transcode or storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(surface = %surface, operation = "upload_bundle"))]
pub async fn upload_bundle(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    multipart: Multipart,
) -> Result<Json<UploadBundleResponse>, HttpAppError> {
    let surface = parse_surface(&surface)?;
    let form = read_upload_form(multipart).await?;

    let data = form
        .file
        .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    let owner = owner_ref(surface, form.owner_entity_id.as_deref().unwrap_or_default())?;

    let response = state
        .bundles
        .upload(UploadRequest {
            owner,
            data,
            filename: form.filename,
            content_type: form.content_type,
            position: form.position,
        })
        .await?;

    Ok(Json(response))
}
