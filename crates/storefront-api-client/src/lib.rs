//! HTTP client for the storefront image API.
//!
//! Provides a minimal client with generic GET/POST/DELETE helpers and domain methods
//! (upload, list, reorder, delete, sign). The [crop] module holds the client-side crop
//! pre-processor that runs before an upload. The CLI uses this crate directly.

pub mod api;
pub mod crop;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default server address when `STOREFRONT_API_URL` is unset
pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";

/// API version prefix (e.g. "/api/v0"). Set STOREFRONT_API_VERSION to match the server.
pub fn api_prefix() -> String {
    let version = std::env::var("STOREFRONT_API_VERSION").unwrap_or_else(|_| "v0".to_string());
    format!("/api/{}", version)
}

/// HTTP client for the storefront image API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: STOREFRONT_API_URL (or API_URL).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("STOREFRONT_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        Self::parse_response(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.build_url(path))
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;
        Self::parse_response(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.build_url(path))
            .multipart(form)
            .send()
            .await
            .context("Failed to send request")?;
        Self::parse_response(response).await
    }

    /// DELETE with a JSON body and deserialize response.
    pub async fn delete_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .delete(self.build_url(path))
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;
        Self::parse_response(response).await
    }
}

pub use api::UploadSource;
pub use crop::{crop, largest_centered, AspectRatio, CropError, CropMode, PixelCrop};
pub use storefront_core::models::{
    ImageSurface, ListBundlesResponse, OkResponse, SignResponse, UploadBundleResponse,
};
