use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::OwnerRef;

/// One stored rendition of a source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub bundle_id: Uuid,
    pub name: String,
    pub storage_path: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: u64,
    pub content_type: String,
}

/// Sibling variants derived from one source image, positioned within the owner's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub bundle_id: Uuid,
    pub owner: OwnerRef,
    pub position: i32,
    pub source_filename: Option<String>,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
}

impl Bundle {
    pub fn storage_paths(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.storage_path.clone()).collect()
    }
}

/// A fully uploaded bundle waiting to be persisted.
#[derive(Debug, Clone)]
pub struct NewBundle {
    pub bundle_id: Uuid,
    pub owner: OwnerRef,
    pub source_filename: Option<String>,
    pub variants: Vec<Variant>,
    /// Requested insertion index; `None` appends at the end.
    pub position: Option<i32>,
}

/// Accept owner ids sent either as JSON strings or integers.
fn deserialize_owner_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawOwnerId {
        Text(String),
        Number(i64),
    }

    Ok(match RawOwnerId::deserialize(deserializer)? {
        RawOwnerId::Text(s) => s.trim().to_string(),
        RawOwnerId::Number(n) => n.to_string(),
    })
}

/// Response body of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadBundleResponse {
    pub bundle_id: Uuid,
    pub position: i32,
    /// Variant name to storage path
    pub paths: BTreeMap<String, String>,
    /// Variant name to signed URL; variants that could not be signed are omitted
    pub urls: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariantResponse {
    pub name: String,
    pub path: String,
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BundleResponse {
    pub bundle_id: Uuid,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub variants: Vec<VariantResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListBundlesResponse {
    pub bundles: Vec<BundleResponse>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListBundlesQuery {
    pub owner_entity_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BundleOrder {
    pub bundle_id: Uuid,
    pub order: i32,
}

/// Complete new ordering for one owner's bundles
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    #[serde(deserialize_with = "deserialize_owner_id")]
    #[validate(length(min = 1, max = 128))]
    pub owner_entity_id: String,
    pub bundles: Vec<BundleOrder>,
}

impl ReorderRequest {
    /// Bundle ids sorted by ascending `order`; ties keep request order.
    pub fn ordered_ids(&self) -> Vec<Uuid> {
        let mut entries: Vec<&BundleOrder> = self.bundles.iter().collect();
        entries.sort_by_key(|entry| entry.order);
        entries.into_iter().map(|entry| entry.bundle_id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBundleRequest {
    pub bundle_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SignRequest {
    #[validate(length(max = 500))]
    pub paths: Vec<String>,
}

/// Path to signed URL; `null` where signing failed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignResponse {
    pub urls: HashMap<String, Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_request_accepts_numeric_owner_id() {
        let request: ReorderRequest = serde_json::from_str(
            r#"{"ownerEntityId": 42, "bundles": [{"bundleId": "6f1c0a52-7f53-4c0e-9d8e-8a9d1c5b2f10", "order": 0}]}"#,
        )
        .unwrap();
        assert_eq!(request.owner_entity_id, "42");
        assert_eq!(request.bundles.len(), 1);
    }

    #[test]
    fn test_ordered_ids_sorts_by_order_and_keeps_ties_stable() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let request = ReorderRequest {
            owner_entity_id: "p1".to_string(),
            bundles: vec![
                BundleOrder { bundle_id: a, order: 2 },
                BundleOrder { bundle_id: b, order: 0 },
                BundleOrder { bundle_id: c, order: 2 },
            ],
        };
        assert_eq!(request.ordered_ids(), vec![b, a, c]);
    }

    #[test]
    fn test_reorder_request_rejects_empty_owner() {
        let request = ReorderRequest {
            owner_entity_id: String::new(),
            bundles: vec![],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_upload_response_uses_camel_case() {
        let response = UploadBundleResponse {
            bundle_id: Uuid::nil(),
            position: 0,
            paths: BTreeMap::from([("thumb".to_string(), "a/thumb/1-x.jpg".to_string())]),
            urls: BTreeMap::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("bundleId").is_some());
        assert_eq!(json["paths"]["thumb"], "a/thumb/1-x.jpg");
    }
}
