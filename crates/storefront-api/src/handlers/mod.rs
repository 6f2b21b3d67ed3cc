//! HTTP handlers. Each stays thin and delegates to `BundleService`.

pub mod bundle_delete;
pub mod bundle_list;
pub mod bundle_reorder;
pub mod bundle_upload;
pub mod media_file;
pub mod media_sign;
pub mod surface;
