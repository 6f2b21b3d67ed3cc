//! Serves locally stored objects behind signed URLs.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use storefront_core::AppError;

#[derive(Debug, Deserialize)]
pub struct SignedFileQuery {
    pub expires: u64,
    pub signature: String,
}

/// Stream a stored variant after checking its signature and expiry.
#[tracing::instrument(skip(state, query), fields(storage_key = %key, operation = "get_media_file"))]
pub async fn get_media_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedFileQuery>,
) -> Result<Response, HttpAppError> {
    let signer = state
        .url_signer
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Media route is not enabled".to_string()))?;

    if let Err(e) = signer.verify(&key, query.expires, &query.signature) {
        tracing::debug!(error = %e, "Rejected signed media URL");
        return Ok(Response::builder()
            .status(StatusCode::FORBIDDEN)
            .body(Body::empty())
            .map_err(|e| AppError::Internal(e.to_string()))?);
    }

    let stream = state.storage.download_stream(&key).await?;
    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(header::CACHE_CONTROL, "private, max-age=300")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
