//! Bundle lifecycle: upload, list, reorder, delete and sign.
//!
//! Keeps HTTP handlers thin. Storage objects are written before the database row, so every
//! failure after a successful build removes the uploaded variants again.

use crate::builder::{BuildRequest, VariantSetBuilder};
use crate::cleanup::delete_objects_best_effort;
use crate::signed_url::SignedUrlResolver;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use storefront_core::models::{
    Bundle, BundleResponse, ImageSurface, ListBundlesResponse, OwnerRef, SignResponse,
    UploadBundleResponse, VariantProfiles, VariantResponse,
};
use storefront_core::AppError;
use storefront_db::BundleRepository;
use storefront_processing::MediaValidator;
use storefront_storage::Storage;
use uuid::Uuid;

/// One image received from an admin surface
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub owner: OwnerRef,
    pub data: Bytes,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    /// Insertion index in the owner's list; `None` appends
    pub position: Option<i32>,
}

pub struct BundleService {
    repository: Arc<dyn BundleRepository>,
    storage: Arc<dyn Storage>,
    builder: VariantSetBuilder,
    resolver: Arc<SignedUrlResolver>,
    profiles: VariantProfiles,
    validator: MediaValidator,
}

impl BundleService {
    pub fn new(
        repository: Arc<dyn BundleRepository>,
        storage: Arc<dyn Storage>,
        resolver: Arc<SignedUrlResolver>,
        profiles: VariantProfiles,
        validator: MediaValidator,
    ) -> Self {
        Self {
            repository,
            builder: VariantSetBuilder::new(storage.clone()),
            storage,
            resolver,
            profiles,
            validator,
        }
    }

    pub fn resolver(&self) -> &Arc<SignedUrlResolver> {
        &self.resolver
    }

    pub fn max_file_size(&self) -> usize {
        self.validator.max_file_size()
    }

    /// Validate, transcode, upload and persist one image as a new bundle.
    #[tracing::instrument(skip(self, request), fields(owner = %request.owner, size_bytes = request.data.len()))]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadBundleResponse, AppError> {
        if request.owner.owner_id.trim().is_empty() {
            return Err(AppError::InvalidInput("ownerEntityId is required".to_string()));
        }

        self.validator.validate_upload(
            request.filename.as_deref(),
            request.content_type.as_deref(),
            &request.data,
        )?;

        let profile = self.profiles.for_surface(request.owner.surface);
        let mut new_bundle = self
            .builder
            .build_bundle(BuildRequest {
                source: request.data,
                specs: &profile.specs,
                owner: &request.owner,
                base_path: request.owner.surface.base_path(),
                filename: request.filename.as_deref(),
            })
            .await?;
        new_bundle.position = request.position;

        let uploaded_paths: Vec<String> = new_bundle
            .variants
            .iter()
            .map(|v| v.storage_path.clone())
            .collect();

        let bundle = match self.repository.create(new_bundle).await {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist bundle, removing uploaded variants");
                delete_objects_best_effort(&self.storage, uploaded_paths).await;
                return Err(e);
            }
        };

        tracing::info!(
            bundle_id = %bundle.bundle_id,
            position = bundle.position,
            "Bundle uploaded"
        );

        let urls = self.resolver.resolve(&bundle.storage_paths()).await;
        let mut response = UploadBundleResponse {
            bundle_id: bundle.bundle_id,
            position: bundle.position,
            paths: BTreeMap::new(),
            urls: BTreeMap::new(),
        };
        for variant in bundle.variants {
            if let Some(Some(url)) = urls.get(&variant.storage_path) {
                response.urls.insert(variant.name.clone(), url.clone());
            }
            response.paths.insert(variant.name, variant.storage_path);
        }
        Ok(response)
    }

    /// Bundles of `owner` in position order, with signed URLs.
    #[tracing::instrument(skip(self), fields(owner = %owner))]
    pub async fn list(&self, owner: &OwnerRef) -> Result<ListBundlesResponse, AppError> {
        let bundles = self.repository.list_by_owner(owner).await?;
        let paths: Vec<String> = bundles.iter().flat_map(Bundle::storage_paths).collect();
        let urls = self.resolver.resolve(&paths).await;

        let bundles = bundles
            .into_iter()
            .map(|bundle| to_bundle_response(bundle, &urls))
            .collect();
        Ok(ListBundlesResponse { bundles })
    }

    /// Apply a complete new ordering to the owner's bundles.
    #[tracing::instrument(skip(self, ordered_ids), fields(owner = %owner, bundle_count = ordered_ids.len()))]
    pub async fn reorder(&self, owner: &OwnerRef, ordered_ids: &[Uuid]) -> Result<(), AppError> {
        self.repository.reorder(owner, ordered_ids).await?;
        tracing::info!("Bundles reordered");
        Ok(())
    }

    /// Delete a bundle of `surface`, then remove its objects from storage.
    ///
    /// Storage cleanup is best-effort; the delete succeeds once the row is gone.
    #[tracing::instrument(skip(self), fields(surface = %surface, bundle_id = %bundle_id))]
    pub async fn delete(&self, surface: ImageSurface, bundle_id: Uuid) -> Result<(), AppError> {
        match self.repository.get(bundle_id).await? {
            Some(bundle) if bundle.owner.surface == surface => {}
            _ => return Err(AppError::NotFound(format!("Bundle {} not found", bundle_id))),
        }

        let removed = self.repository.delete(bundle_id).await?;
        let paths = removed.storage_paths();
        for path in &paths {
            self.resolver.cache().invalidate(path);
        }

        let failed = delete_objects_best_effort(&self.storage, paths).await;
        tracing::info!(
            owner = %removed.owner,
            orphaned_objects = failed,
            "Bundle deleted"
        );
        Ok(())
    }

    /// Signed URL for every path; `None` where signing failed.
    pub async fn sign(&self, paths: &[String]) -> SignResponse {
        SignResponse {
            urls: self.resolver.resolve(paths).await,
        }
    }
}

fn to_bundle_response(bundle: Bundle, urls: &HashMap<String, Option<String>>) -> BundleResponse {
    BundleResponse {
        bundle_id: bundle.bundle_id,
        position: bundle.position,
        created_at: bundle.created_at,
        variants: bundle
            .variants
            .into_iter()
            .map(|v| VariantResponse {
                url: urls.get(&v.storage_path).cloned().flatten(),
                name: v.name,
                path: v.storage_path,
                width: v.width,
                height: v.height,
            })
            .collect(),
    }
}
