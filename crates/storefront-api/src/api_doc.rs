//! OpenAPI documentation, served at `/api/openapi.json` and browsable under `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use storefront_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront Image API",
        version = "0.1.0",
        description = "Product image pipeline (v0): upload source images as bundles of JPEG variants, list and reorder them per owner, delete them and resolve stored paths to signed URLs. All JSON endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::bundle_upload::upload_bundle,
        handlers::bundle_list::list_bundles,
        handlers::bundle_reorder::reorder_bundles,
        handlers::bundle_delete::delete_bundle,
        handlers::media_sign::sign_paths,
    ),
    components(
        schemas(
            models::UploadBundleResponse,
            models::BundleResponse,
            models::VariantResponse,
            models::ListBundlesResponse,
            models::ReorderRequest,
            models::BundleOrder,
            models::DeleteBundleRequest,
            models::OkResponse,
            models::SignRequest,
            models::SignResponse,
            models::VariantSpec,
            models::ResizeMode,
            models::ImageSurface,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "images", description = "Image bundles per admin surface"),
        (name = "media", description = "Signed URL resolution")
    )
)]
pub struct ApiDoc;
