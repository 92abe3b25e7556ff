use crate::keys::derive_object_key;
use crate::origin::OriginDownloader;
use crate::repo::{ImageAssetRepository, ProductRepository};
use crate::{ImageError, ImageErrorCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vitrine_core::{sha256_hex, short_digest, unix_millis};
use vitrine_model::{
    infer_mime_from_name, sanitize_filename, validate_upload, AssetSource, ImageAsset, ImageSlot,
    ProductId, SlotRef, SyncStatus,
};
use vitrine_store::AssetStore;

/// The explicit dependency bundle for the whole image subsystem: asset
/// store, the two repositories, and the origin download client. Constructed
/// once at startup and shared behind an `Arc`; the checker, repair engine,
/// and sweeper are all methods on it.
pub struct ImageService {
    pub(crate) store: Arc<dyn AssetStore>,
    pub(crate) products: Arc<dyn ProductRepository>,
    pub(crate) assets: Arc<dyn ImageAssetRepository>,
    pub(crate) origin: Arc<dyn OriginDownloader>,
    pub(crate) bucket: String,
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub product_id: ProductId,
    pub slot: ImageSlot,
    pub bytes: Vec<u8>,
    pub original_name: String,
    /// Explicit content type from the caller; inferred from the file name
    /// when absent.
    pub mime_type: Option<String>,
}

/// One populated slot with its resolved asset record, as served by the
/// listing endpoints. `asset` is `None` exactly when the record is missing,
/// which is itself a reportable drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotImage {
    pub slot: ImageSlot,
    pub reference: SlotRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<ImageAsset>,
}

impl ImageService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AssetStore>,
        products: Arc<dyn ProductRepository>,
        assets: Arc<dyn ImageAssetRepository>,
        origin: Arc<dyn OriginDownloader>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            products,
            assets,
            origin,
            bucket: bucket.into(),
        }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Direct upload ingestion.
    pub async fn ingest(&self, request: IngestRequest) -> Result<ImageAsset, ImageError> {
        self.ingest_inner(request, AssetSource::Upload, None).await
    }

    /// Origin-sourced ingestion; the token is retained on the asset so a
    /// lost storage object can be fetched again during repair.
    pub async fn ingest_from_origin(
        &self,
        product_id: &ProductId,
        slot: ImageSlot,
        origin_token: &str,
        original_name: &str,
    ) -> Result<ImageAsset, ImageError> {
        let bytes = self.origin.download(origin_token).await?;
        let request = IngestRequest {
            product_id: product_id.clone(),
            slot,
            bytes,
            original_name: original_name.to_string(),
            mime_type: None,
        };
        self.ingest_inner(request, AssetSource::Origin, Some(origin_token.to_string()))
            .await
    }

    pub(crate) async fn ingest_inner(
        &self,
        request: IngestRequest,
        source: AssetSource,
        origin_token: Option<String>,
    ) -> Result<ImageAsset, ImageError> {
        let name = sanitize_filename(&request.original_name);
        let mime_type = request
            .mime_type
            .clone()
            .unwrap_or_else(|| infer_mime_from_name(&name).to_string());
        validate_upload(&mime_type, request.bytes.len() as u64)?;

        let content_hash = sha256_hex(&request.bytes);
        let now = unix_millis();
        let object_key =
            derive_object_key(&request.product_id, request.slot, &content_hash, now, &mime_type);
        let previous = self
            .assets
            .find_by_product_slot(&request.product_id, request.slot)
            .await?;
        let prior_attempts = previous.as_ref().map_or(0, |p| p.sync_attempts);

        // Storage write comes first; when it fails neither record mutates.
        self.store
            .put(&self.bucket, &object_key, &request.bytes)
            .await?;

        let asset_id = format!(
            "img-{}",
            short_digest(&format!(
                "{}/{}/{content_hash}/{now}",
                request.product_id, request.slot
            ))
        );
        let mut asset = ImageAsset {
            asset_id,
            product_id: request.product_id.clone(),
            slot: request.slot,
            bucket: self.bucket.clone(),
            object_key: object_key.clone(),
            original_name: name,
            file_size: request.bytes.len() as u64,
            mime_type,
            width: None,
            height: None,
            public_url: self.store.object_url(&self.bucket, &object_key),
            thumbnails: Vec::new(),
            content_hash,
            sync_status: SyncStatus::Synced,
            sync_attempts: prior_attempts + 1,
            last_sync_time: Some(now),
            product_exists: true,
            file_exists: true,
            is_active: true,
            is_public: true,
            source,
            origin_token,
            created_at: now,
        };
        self.assets.upsert(&asset).await?;

        // The replaced object would be caught by the sweeper eventually;
        // removing it here just keeps the bucket tidy.
        if let Some(prev) = &previous {
            if prev.object_key != object_key {
                if let Err(err) = self.store.remove(&prev.bucket, &prev.object_key).await {
                    if !err.is_not_found() {
                        debug!(key = %prev.object_key, error = %err, "stale object removal failed");
                    }
                }
            }
        }

        // Best-effort mirror onto the product; a failure here is exactly
        // the drift the checker exists to find.
        let reference = SlotRef::Structured(asset.structured_ref(now));
        match self
            .products
            .set_slot(&request.product_id, request.slot, reference)
            .await
        {
            Ok(()) => {
                info!(
                    product_id = %request.product_id,
                    slot = %request.slot,
                    asset_id = %asset.asset_id,
                    source = source.as_str(),
                    "image ingested"
                );
            }
            Err(err) => {
                warn!(
                    product_id = %request.product_id,
                    slot = %request.slot,
                    error = %err,
                    "product slot update failed after ingest; drift left for checker"
                );
                asset.sync_status = SyncStatus::Failed;
                asset.product_exists = false;
                self.assets.upsert(&asset).await?;
            }
        }
        Ok(asset)
    }

    /// Dedup probe for callers that want to reuse existing bytes.
    pub async fn find_by_content_hash(&self, hash: &str) -> Result<Vec<ImageAsset>, ImageError> {
        Ok(self.assets.find_by_content_hash(hash).await?)
    }

    /// All populated slots with resolved asset metadata.
    pub async fn list_images(&self, product_id: &ProductId) -> Result<Vec<SlotImage>, ImageError> {
        let product = self.products.get(product_id).await?.ok_or_else(|| {
            ImageError::new(
                ImageErrorCode::NotFound,
                format!("product {product_id} not found"),
            )
        })?;
        let mut out = Vec::new();
        for (slot, reference) in &product.images {
            let asset = self.assets.find_by_product_slot(product_id, *slot).await?;
            out.push(SlotImage {
                slot: *slot,
                reference: reference.clone(),
                asset,
            });
        }
        Ok(out)
    }

    /// Single slot detail; `NotFound` covers both a missing product and an
    /// empty slot.
    pub async fn slot_detail(
        &self,
        product_id: &ProductId,
        slot: ImageSlot,
    ) -> Result<SlotImage, ImageError> {
        let product = self.products.get(product_id).await?.ok_or_else(|| {
            ImageError::new(
                ImageErrorCode::NotFound,
                format!("product {product_id} not found"),
            )
        })?;
        let reference = product.slot(slot).cloned().ok_or_else(|| {
            ImageError::new(
                ImageErrorCode::NotFound,
                format!("product {product_id} has no {slot} image"),
            )
        })?;
        let asset = self.assets.find_by_product_slot(product_id, slot).await?;
        Ok(SlotImage {
            slot,
            reference,
            asset,
        })
    }

    /// Explicit deletion cascade: storage object and thumbnails first, then
    /// the asset record, then the product reference. Replaces what the
    /// original system hid in document middleware.
    pub async fn delete_image(
        &self,
        product_id: &ProductId,
        slot: ImageSlot,
    ) -> Result<bool, ImageError> {
        let Some(asset) = self.assets.find_by_product_slot(product_id, slot).await? else {
            // No record; still unset the slot so a dangling reference dies.
            self.products.clear_slot(product_id, slot).await?;
            return Ok(false);
        };
        match self.store.remove(&asset.bucket, &asset.object_key).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }
        for thumb in &asset.thumbnails {
            match self.store.remove(&asset.bucket, &thumb.object_key).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    warn!(key = %thumb.object_key, error = %err, "thumbnail removal failed");
                }
            }
        }
        self.assets.delete(&asset.asset_id).await?;
        self.products.clear_slot(product_id, slot).await?;
        info!(product_id = %product_id, slot = %slot, asset_id = %asset.asset_id, "image deleted");
        Ok(true)
    }
}
