use crate::slot::{ImageSlot, StructuredRef};
use crate::ProductId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}

/// Where the bytes of an asset came from. `Repair` marks records synthesized
/// from a dangling product reference so audits can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetSource {
    Upload,
    Origin,
    Repair,
}

impl AssetSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Origin => "origin",
            Self::Repair => "repair",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub object_key: String,
    pub public_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Standalone record for one stored image file.
///
/// `product_id` is a soft reference: the owning product may be deleted out
/// from under it, which the sweeper detects. `(product_id, slot)` and
/// `(bucket, object_key)` are both unique across live records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub asset_id: String,
    pub product_id: ProductId,
    pub slot: ImageSlot,
    pub bucket: String,
    pub object_key: String,
    pub original_name: String,
    pub file_size: u64,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub public_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnails: Vec<Thumbnail>,
    pub content_hash: String,
    pub sync_status: SyncStatus,
    pub sync_attempts: u32,
    /// Unix millis of the last successful sync of the product reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<u64>,
    pub product_exists: bool,
    pub file_exists: bool,
    pub is_active: bool,
    pub is_public: bool,
    pub source: AssetSource,
    /// Opaque handle into the external content source, kept so a lost
    /// storage object can be re-downloaded during repair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_token: Option<String>,
    pub created_at: u64,
}

impl ImageAsset {
    /// Projects this asset into the structured slot reference written onto
    /// the owning product. The asset is the source of truth for every field.
    #[must_use]
    pub fn structured_ref(&self, now_millis: u64) -> StructuredRef {
        StructuredRef {
            asset_id: self.asset_id.clone(),
            url: self.public_url.clone(),
            object_key: self.object_key.clone(),
            last_updated: now_millis,
            file_size: Some(self.file_size),
            mime_type: Some(self.mime_type.clone()),
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> ImageAsset {
        ImageAsset {
            asset_id: "img-abc".to_string(),
            product_id: ProductId::parse("p-1").unwrap(),
            slot: ImageSlot::Front,
            bucket: "catalog".to_string(),
            object_key: "products/p-1/front/abc.jpg".to_string(),
            original_name: "a.jpg".to_string(),
            file_size: 9,
            mime_type: "image/jpeg".to_string(),
            width: None,
            height: None,
            public_url: "https://cdn.example/products/p-1/front/abc.jpg".to_string(),
            thumbnails: Vec::new(),
            content_hash: "deadbeef".to_string(),
            sync_status: SyncStatus::Synced,
            sync_attempts: 1,
            last_sync_time: Some(10),
            product_exists: true,
            file_exists: true,
            is_active: true,
            is_public: true,
            source: AssetSource::Upload,
            origin_token: None,
            created_at: 10,
        }
    }

    #[test]
    fn structured_ref_mirrors_asset_fields() {
        let a = asset();
        let r = a.structured_ref(42);
        assert_eq!(r.asset_id, a.asset_id);
        assert_eq!(r.url, a.public_url);
        assert_eq!(r.object_key, a.object_key);
        assert_eq!(r.last_updated, 42);
        assert_eq!(r.file_size, Some(9));
    }

    #[test]
    fn asset_serializes_camel_case() {
        let v = serde_json::to_value(asset()).unwrap();
        assert!(v.get("assetId").is_some());
        assert!(v.get("objectKey").is_some());
        assert!(v.get("syncStatus").is_some());
        assert!(v.get("originToken").is_none());
    }
}
