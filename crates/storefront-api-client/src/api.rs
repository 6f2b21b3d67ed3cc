//! Domain methods for the storefront API client.
//!
//! Request and response bodies are the `storefront_core::models` types the server uses.

use crate::crop::{self, CropMode};
use crate::{api_prefix, ApiClient};
use anyhow::{Context, Result};
use std::path::Path;
use storefront_core::models::{
    BundleOrder, DeleteBundleRequest, ImageSurface, ListBundlesResponse, OkResponse,
    ReorderRequest, SignRequest, SignResponse, UploadBundleResponse,
};
use uuid::Uuid;

/// A selected file on its way to the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

impl UploadSource {
    /// Read a local file, rejecting paths that climb out of the working tree.
    pub fn from_path(path: &Path) -> Result<Self> {
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(anyhow::anyhow!("Invalid input: {}", path.display()));
        }
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.jpg")
            .to_string();

        Ok(Self {
            content_type: content_type_for(&filename).map(String::from),
            data,
            filename,
        })
    }

    /// Apply the crop mode. Cropping fails here, before any request is sent.
    pub fn prepare(self, mode: CropMode) -> Result<Self, crop::CropError> {
        match mode {
            CropMode::Verbatim => Ok(self),
            CropMode::Cropped(ratio, rect) => {
                let data = crop::crop(&self.data, ratio, rect)?;
                Ok(Self {
                    data,
                    filename: jpeg_filename(&self.filename),
                    content_type: Some("image/jpeg".to_string()),
                })
            }
        }
    }
}

fn content_type_for(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn jpeg_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{}.jpg", stem)
}

impl ApiClient {
    fn images_path(surface: ImageSurface) -> String {
        format!("{}/{}/images", api_prefix(), surface)
    }

    /// Upload one image as a new bundle, cropping it first unless `mode` is verbatim.
    pub async fn upload(
        &self,
        surface: ImageSurface,
        owner_entity_id: &str,
        source: UploadSource,
        mode: CropMode,
        position: Option<i32>,
    ) -> Result<UploadBundleResponse> {
        let source = source.prepare(mode).context("Crop failed")?;

        let mut part =
            reqwest::multipart::Part::bytes(source.data).file_name(source.filename.clone());
        if let Some(content_type) = &source.content_type {
            part = part
                .mime_str(content_type)
                .context("Invalid content type")?;
        }

        let mut form = reqwest::multipart::Form::new()
            .text("ownerEntityId", owner_entity_id.to_string())
            .part("file", part);
        if let Some(position) = position {
            form = form.text("position", position.to_string());
        }

        tracing::debug!(
            surface = %surface,
            owner = owner_entity_id,
            filename = %source.filename,
            "Uploading image"
        );
        self.post_multipart(&Self::images_path(surface), form).await
    }

    /// Bundles of one owner in display order.
    pub async fn list(
        &self,
        surface: ImageSurface,
        owner_entity_id: &str,
    ) -> Result<ListBundlesResponse> {
        self.get(
            &Self::images_path(surface),
            &[("ownerEntityId", owner_entity_id.to_string())],
        )
        .await
    }

    /// Replace the owner's ordering; `ordered` must list every bundle exactly once.
    pub async fn reorder(
        &self,
        surface: ImageSurface,
        owner_entity_id: &str,
        ordered: &[Uuid],
    ) -> Result<OkResponse> {
        let body = ReorderRequest {
            owner_entity_id: owner_entity_id.to_string(),
            bundles: ordered
                .iter()
                .enumerate()
                .map(|(order, bundle_id)| BundleOrder {
                    bundle_id: *bundle_id,
                    order: order as i32,
                })
                .collect(),
        };
        self.post_json(&format!("{}/reorder", Self::images_path(surface)), &body)
            .await
    }

    pub async fn delete(&self, surface: ImageSurface, bundle_id: Uuid) -> Result<OkResponse> {
        self.delete_json(
            &Self::images_path(surface),
            &DeleteBundleRequest { bundle_id },
        )
        .await
    }

    /// Signed URLs for stored paths; `None` where the server could not sign.
    pub async fn sign(&self, paths: Vec<String>) -> Result<SignResponse> {
        self.post_json(
            &format!("{}/media/sign", api_prefix()),
            &SignRequest { paths },
        )
        .await
    }
}
