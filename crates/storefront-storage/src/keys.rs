//! Shared storage-key helpers.
//!
//! Variant key format: `{base_path}/{owner_id}/{bundle_id}/{variant}/{timestamp_ms}-{filename}`.

use crate::traits::{Storage, StorageError, StorageResult};
use std::fmt::Display;

/// Prefix of the image proxy route; values stored with it are normalized to bare keys.
pub const PROXY_PREFIX: &str = "/api/images/";

/// Reject keys that could escape the bucket root or the local storage directory.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key must be a relative path".to_string(),
        ));
    }
    if storage_key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid segments".to_string(),
        ));
    }
    Ok(())
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_segment(input: &str) -> String {
    let sanitized: String = input
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Build the storage key of one variant of a bundle.
pub fn variant_key(
    base_path: &str,
    owner_id: &str,
    bundle_id: impl Display,
    variant_name: &str,
    timestamp_ms: i64,
    filename: &str,
) -> String {
    format!(
        "{}/{}/{}/{}/{}-{}",
        base_path.trim_matches('/'),
        sanitize_segment(owner_id),
        bundle_id,
        sanitize_segment(variant_name),
        timestamp_ms,
        sanitize_segment(filename)
    )
}

/// Split `scheme://host/path?query` into `(host, path)` without the leading slash.
pub fn split_url(url: &str) -> Option<(&str, &str)> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    match rest.split_once('/') {
        Some((host, path)) => Some((host, path.trim_start_matches('/'))),
        None => Some((rest, "")),
    }
}

/// Normalize a stored image reference into an object key of `storage`.
///
/// Accepts bare keys, proxy URLs (`/api/images/<key>`) and URLs the backend recognizes
/// as its own. Returns `None` for `data:` URIs, foreign URLs and blank input.
pub fn to_object_key(input: &str, storage: &dyn Storage) -> Option<String> {
    let raw = input.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }

    if let Some(key) = raw.strip_prefix(PROXY_PREFIX) {
        let key = key.trim_start_matches('/');
        return (!key.is_empty()).then(|| key.to_string());
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return storage.key_from_url(raw).filter(|k| !k.is_empty());
    }

    let key = raw.trim_start_matches('/');
    (!key.is_empty()).then(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("product-images/p1/b1/thumb/1-a.jpg").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a//b").is_err());
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("My Photo (1).jpg"), "My_Photo__1_.jpg");
        assert_eq!(sanitize_segment(".."), "_");
        assert_eq!(sanitize_segment(""), "_");
        assert_eq!(sanitize_segment("été.png"), "_t_.png");
    }

    #[test]
    fn test_variant_key_layout() {
        let key = variant_key(
            "product-images",
            "42",
            "b7e1",
            "thumb",
            1_700_000_000_000,
            "shoe.jpg",
        );
        assert_eq!(key, "product-images/42/b7e1/thumb/1700000000000-shoe.jpg");
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn test_variant_key_sanitizes_owner() {
        let key = variant_key("pages/hero", "../x", "b", "full", 1, "a.jpg");
        assert!(validate_key(&key).is_ok());
        assert!(key.starts_with("pages/hero/.._x/"));
    }

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("https://bucket.s3.amazonaws.com/a/b.jpg?X-Amz=1"),
            Some(("bucket.s3.amazonaws.com", "a/b.jpg"))
        );
        assert_eq!(split_url("http://host"), Some(("host", "")));
        assert_eq!(split_url("ftp://host/a"), None);
    }
}
