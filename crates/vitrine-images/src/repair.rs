use crate::keys::{derive_object_key, object_key_from_url};
use crate::service::ImageService;
use crate::ImageError;
use tracing::{info, warn};
use vitrine_core::{short_digest, unix_millis};
use vitrine_model::{
    AssetSource, ConsistencyCheck, ImageAsset, ImageSlot, ProductId, RepairAction, RepairResult,
    SlotRef, SyncStatus,
};

impl ImageService {
    /// Runs the checker and dispatches one corrective action per returned
    /// check, in priority order: synthesize a missing asset record, re-sync
    /// a diverged product reference (the asset is authoritative), then
    /// re-download a lost object. Re-running over a consistent product is
    /// all no-ops.
    pub async fn repair(&self, product_id: &ProductId) -> Result<RepairResult, ImageError> {
        let checks = self.check(product_id).await?;
        let mut result = RepairResult::default();
        for check in checks {
            self.dispatch(product_id, &check, &mut result).await;
        }
        info!(
            product_id = %product_id,
            repaired = result.repaired,
            failed = result.failed,
            "repair pass complete"
        );
        Ok(result)
    }

    async fn dispatch(
        &self,
        product_id: &ProductId,
        check: &ConsistencyCheck,
        result: &mut RepairResult,
    ) {
        let issues = check.issues;
        if issues.product_record_missing {
            result.record_failure(
                None,
                RepairAction::Noop,
                "product record missing; nothing to repair against",
            );
            return;
        }
        let Some(slot) = check.slot else {
            result.record_success(None, RepairAction::Noop);
            return;
        };

        if issues.image_record_missing {
            match self.synthesize_asset(product_id, slot).await {
                Ok(asset) => {
                    info!(
                        product_id = %product_id,
                        slot = %slot,
                        asset_id = %asset.asset_id,
                        "asset record synthesized from product slot"
                    );
                    result.record_success(Some(slot), RepairAction::Synthesize);
                }
                Err(err) => result.record_failure(Some(slot), RepairAction::Synthesize, err.to_string()),
            }
        } else if issues.url_mismatch || issues.metadata_mismatch {
            match self.resync_reference(product_id, slot).await {
                Ok(()) => result.record_success(Some(slot), RepairAction::Resync),
                Err(err) => result.record_failure(Some(slot), RepairAction::Resync, err.to_string()),
            }
        } else if issues.file_not_exists {
            match self.redownload(product_id, slot).await {
                Ok(()) => result.record_success(Some(slot), RepairAction::Redownload),
                Err(err) => {
                    warn!(
                        product_id = %product_id,
                        slot = %slot,
                        error = %err,
                        "redownload repair failed"
                    );
                    result.record_failure(Some(slot), RepairAction::Redownload, err.to_string());
                }
            }
        } else {
            result.record_success(Some(slot), RepairAction::Noop);
        }
    }

    /// Creates an asset record from whatever the product slot still knows.
    /// Synthesized records carry `source = repair` so audits can tell them
    /// from originally-ingested ones.
    async fn synthesize_asset(
        &self,
        product_id: &ProductId,
        slot: ImageSlot,
    ) -> Result<ImageAsset, ImageError> {
        let product = self.products.get(product_id).await?.ok_or_else(|| {
            ImageError::new(
                crate::ImageErrorCode::NotFound,
                format!("product {product_id} vanished during repair"),
            )
        })?;
        let reference = product.slot(slot).cloned().ok_or_else(|| {
            ImageError::new(
                crate::ImageErrorCode::NotFound,
                format!("slot {slot} emptied during repair"),
            )
        })?;

        let now = unix_millis();
        let url = reference.url().to_string();
        let (asset_id, object_key, file_size, mime_type, width, height) = match &reference {
            SlotRef::Structured(s) => (
                s.asset_id.clone(),
                s.object_key.clone(),
                s.file_size.unwrap_or(0),
                s.mime_type
                    .clone()
                    .unwrap_or_else(|| "image/jpeg".to_string()),
                s.width,
                s.height,
            ),
            SlotRef::Legacy(legacy_url) => {
                let key = object_key_from_url(legacy_url, &self.bucket).unwrap_or_else(|| {
                    derive_object_key(product_id, slot, "legacy", now, "image/jpeg")
                });
                let id = format!("img-{}", short_digest(&format!("{product_id}/{slot}/{key}")));
                (id, key, 0, "image/jpeg".to_string(), None, None)
            }
        };

        let file_exists = self
            .store
            .stat(&self.bucket, &object_key)
            .await
            .is_ok();
        let asset = ImageAsset {
            asset_id,
            product_id: product_id.clone(),
            slot,
            bucket: self.bucket.clone(),
            object_key,
            original_name: String::new(),
            file_size,
            mime_type,
            width,
            height,
            public_url: url,
            thumbnails: Vec::new(),
            // No bytes were seen, so there is no hash to dedup against.
            content_hash: String::new(),
            sync_status: SyncStatus::Synced,
            sync_attempts: 1,
            last_sync_time: Some(now),
            product_exists: true,
            file_exists,
            is_active: true,
            is_public: true,
            source: AssetSource::Repair,
            origin_token: None,
            created_at: now,
        };
        self.assets.upsert(&asset).await?;
        Ok(asset)
    }

    /// Overwrites the product's slot reference from the asset record and
    /// refreshes the asset's sync bookkeeping.
    async fn resync_reference(
        &self,
        product_id: &ProductId,
        slot: ImageSlot,
    ) -> Result<(), ImageError> {
        let mut asset = self
            .assets
            .find_by_product_slot(product_id, slot)
            .await?
            .ok_or_else(|| {
                ImageError::new(
                    crate::ImageErrorCode::NotFound,
                    format!("asset for {product_id}/{slot} vanished during repair"),
                )
            })?;
        let now = unix_millis();
        self.products
            .set_slot(product_id, slot, SlotRef::Structured(asset.structured_ref(now)))
            .await?;
        asset.sync_status = SyncStatus::Synced;
        asset.last_sync_time = Some(now);
        asset.product_exists = true;
        self.assets.upsert(&asset).await?;
        Ok(())
    }

    /// Re-runs origin ingestion for a slot whose object was lost. Without a
    /// retained origin token the loss is unrepairable.
    async fn redownload(&self, product_id: &ProductId, slot: ImageSlot) -> Result<(), ImageError> {
        let asset = self
            .assets
            .find_by_product_slot(product_id, slot)
            .await?
            .ok_or_else(|| {
                ImageError::new(
                    crate::ImageErrorCode::NotFound,
                    format!("asset for {product_id}/{slot} vanished during repair"),
                )
            })?;
        let token = asset.origin_token.clone().ok_or_else(|| {
            ImageError::new(
                crate::ImageErrorCode::Origin,
                format!(
                    "object {} is missing and asset {} retains no origin token; unrepairable",
                    asset.object_key, asset.asset_id
                ),
            )
        })?;
        self.ingest_from_origin(product_id, slot, &token, &asset.original_name)
            .await?;
        Ok(())
    }
}
