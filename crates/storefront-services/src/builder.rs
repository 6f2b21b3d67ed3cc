//! Variant Set Builder
//!
//! Turns one source image into a bundle: every variant is transcoded on the blocking pool
//! and uploaded concurrently, and the build only succeeds once all of them are stored.
//! A failed variant fails the whole bundle and the variants that did land are removed.

use crate::cleanup::delete_objects_best_effort;
use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use storefront_core::models::{NewBundle, OwnerRef, Variant, VariantProfile, VariantSpec};
use storefront_core::AppError;
use storefront_processing::{sanitize_filename, transcode};
use storefront_storage::keys::variant_key;
use storefront_storage::{Storage, UploadOptions};
use uuid::Uuid;

/// Input of one bundle build
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub source: Bytes,
    pub specs: &'a [VariantSpec],
    pub owner: &'a OwnerRef,
    /// Storage folder, e.g. `product-images`
    pub base_path: &'a str,
    pub filename: Option<&'a str>,
}

#[derive(Clone)]
pub struct VariantSetBuilder {
    storage: Arc<dyn Storage>,
}

impl VariantSetBuilder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Transcode and upload every variant of `request.source`.
    ///
    /// Returns the bundle ready to persist, with a fresh id and fresh storage paths on
    /// every call.
    #[tracing::instrument(
        skip(self, request),
        fields(
            owner = %request.owner,
            variant_count = request.specs.len(),
            source_bytes = request.source.len(),
            bundle_id = tracing::field::Empty
        )
    )]
    pub async fn build_bundle(&self, request: BuildRequest<'_>) -> Result<NewBundle, AppError> {
        VariantProfile::new(request.specs.to_vec())
            .validate()
            .map_err(AppError::InvalidInput)?;

        let start = std::time::Instant::now();
        let bundle_id = Uuid::new_v4();
        tracing::Span::current().record("bundle_id", tracing::field::display(bundle_id));

        let timestamp_ms = Utc::now().timestamp_millis();
        let filename = sanitize_filename(request.filename);

        let tasks = request.specs.iter().map(|spec| {
            let key = variant_key(
                request.base_path,
                &request.owner.owner_id,
                bundle_id,
                &spec.name,
                timestamp_ms,
                &filename,
            );
            self.build_variant(bundle_id, request.source.clone(), spec.clone(), key)
        });
        let results = join_all(tasks).await;

        let mut variants = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(variant) => variants.push(variant),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(error) = first_error {
            let uploaded: Vec<String> = variants.into_iter().map(|v| v.storage_path).collect();
            tracing::warn!(
                error = %error,
                uploaded = uploaded.len(),
                "Bundle build failed, removing uploaded variants"
            );
            delete_objects_best_effort(&self.storage, uploaded).await;
            return Err(error);
        }

        tracing::info!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Bundle variants uploaded"
        );

        Ok(NewBundle {
            bundle_id,
            owner: request.owner.clone(),
            source_filename: request.filename.map(String::from),
            variants,
            position: None,
        })
    }

    async fn build_variant(
        &self,
        bundle_id: Uuid,
        source: Bytes,
        spec: VariantSpec,
        key: String,
    ) -> Result<Variant, AppError> {
        let name = spec.name.clone();
        let transcoded = tokio::task::spawn_blocking(move || transcode(&source, &spec))
            .await
            .map_err(|e| AppError::Internal(format!("Transcode task failed: {}", e)))??;

        let size_bytes = transcoded.data.len() as u64;
        let content_type = transcoded.content_type().to_string();

        let stored = self
            .storage
            .upload(&key, transcoded.data, &UploadOptions::jpeg())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, storage_key = %key, variant = %name, "Variant upload failed");
                AppError::from(e)
            })?;

        Ok(Variant {
            bundle_id,
            name,
            storage_path: stored.path,
            width: Some(transcoded.width),
            height: Some(transcoded.height),
            size_bytes,
            content_type,
        })
    }
}
