//! API constants
//!
//! Every JSON endpoint is versioned under [`API_PREFIX`]. Signed local files are served
//! outside the versioned prefix so their URLs match `LOCAL_STORAGE_BASE_URL`.

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

pub const API_VERSION: &str = "v0";

/// Versioned prefix of every JSON route
pub const API_PREFIX: &str = "/api/v0";

/// Route serving locally stored objects behind signed URLs
pub const MEDIA_ROUTE: &str = storefront_core::config::LOCAL_MEDIA_ROUTE;
