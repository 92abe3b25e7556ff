use crate::keys::PRODUCTS_KEY_PREFIX;
use crate::service::ImageService;
use crate::ImageError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use vitrine_model::CleanupResult;

impl ImageService {
    /// Full sweep with no interrupt hook; batch callers that want to stop a
    /// long run early use [`ImageService::sweep_interruptible`].
    pub async fn sweep(&self) -> Result<CleanupResult, ImageError> {
        let never = AtomicBool::new(false);
        self.sweep_interruptible(&never).await
    }

    /// Three independent passes over the full collections: asset records
    /// with no owning product, storage objects with no asset record, and
    /// structured product references resolving to nothing. Each item is
    /// handled independently, so stopping between items never corrupts
    /// state; per-item failures are collected, not fatal.
    pub async fn sweep_interruptible(
        &self,
        stop: &AtomicBool,
    ) -> Result<CleanupResult, ImageError> {
        let mut result = CleanupResult::default();
        self.sweep_orphaned_assets(stop, &mut result).await?;
        if !result.interrupted {
            self.sweep_orphaned_objects(stop, &mut result).await?;
        }
        if !result.interrupted {
            self.sweep_invalid_references(stop, &mut result).await?;
        }
        info!(
            orphaned_images = result.orphaned_images,
            orphaned_objects = result.orphaned_objects,
            invalid_references = result.invalid_references,
            freed_bytes = result.freed_bytes,
            errors = result.errors.len(),
            interrupted = result.interrupted,
            "sweep complete"
        );
        Ok(result)
    }

    async fn sweep_orphaned_assets(
        &self,
        stop: &AtomicBool,
        result: &mut CleanupResult,
    ) -> Result<(), ImageError> {
        let assets = self.assets.list_all().await?;
        for asset in assets {
            if stop.load(Ordering::Relaxed) {
                result.interrupted = true;
                return Ok(());
            }
            match self.products.exists(&asset.product_id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    result
                        .errors
                        .push(format!("owner probe failed for {}: {err}", asset.asset_id));
                    continue;
                }
            }

            let mut object_gone = true;
            match self.store.remove(&asset.bucket, &asset.object_key).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    object_gone = false;
                    result.errors.push(format!(
                        "object removal failed for {}/{}: {err}",
                        asset.bucket, asset.object_key
                    ));
                }
            }
            for thumb in &asset.thumbnails {
                match self.store.remove(&asset.bucket, &thumb.object_key).await {
                    Ok(()) => {}
                    Err(err) if err.is_not_found() => {}
                    Err(err) => result.errors.push(format!(
                        "thumbnail removal failed for {}: {err}",
                        thumb.object_key
                    )),
                }
            }

            if object_gone {
                match self.assets.delete(&asset.asset_id).await {
                    Ok(_) => {
                        result.orphaned_images += 1;
                        result.freed_bytes += asset.file_size;
                    }
                    Err(err) => result
                        .errors
                        .push(format!("record delete failed for {}: {err}", asset.asset_id)),
                }
            } else {
                // The object outlived its delete attempt; retire the record
                // softly and let a later sweep finish the job.
                let mut retired = asset.clone();
                retired.product_exists = false;
                retired.is_active = false;
                if let Err(err) = self.assets.upsert(&retired).await {
                    result
                        .errors
                        .push(format!("soft-retire failed for {}: {err}", asset.asset_id));
                }
                warn!(asset_id = %asset.asset_id, "orphaned asset soft-retired, object removal pending");
            }
        }
        Ok(())
    }

    async fn sweep_orphaned_objects(
        &self,
        stop: &AtomicBool,
        result: &mut CleanupResult,
    ) -> Result<(), ImageError> {
        // Fresh listing: pass one may have deleted records.
        let live = self.assets.list_all().await?;
        let mut known: HashSet<String> = HashSet::new();
        for asset in &live {
            if asset.bucket == self.bucket {
                known.insert(asset.object_key.clone());
                for thumb in &asset.thumbnails {
                    known.insert(thumb.object_key.clone());
                }
            }
        }

        let objects = match self.store.list(&self.bucket, PRODUCTS_KEY_PREFIX).await {
            Ok(objects) => objects,
            Err(err) => {
                result
                    .errors
                    .push(format!("object listing failed: {err}"));
                return Ok(());
            }
        };
        for object in objects {
            if stop.load(Ordering::Relaxed) {
                result.interrupted = true;
                return Ok(());
            }
            if known.contains(&object.key) {
                continue;
            }
            match self.store.remove(&self.bucket, &object.key).await {
                Ok(()) => {
                    result.orphaned_objects += 1;
                    result.freed_bytes += object.size;
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => result
                    .errors
                    .push(format!("orphan object removal failed for {}: {err}", object.key)),
            }
        }
        Ok(())
    }

    async fn sweep_invalid_references(
        &self,
        stop: &AtomicBool,
        result: &mut CleanupResult,
    ) -> Result<(), ImageError> {
        let ids = self.products.list_ids().await?;
        for id in ids {
            if stop.load(Ordering::Relaxed) {
                result.interrupted = true;
                return Ok(());
            }
            let product = match self.products.get(&id).await {
                Ok(Some(product)) => product,
                Ok(None) => continue,
                Err(err) => {
                    result
                        .errors
                        .push(format!("product load failed for {id}: {err}"));
                    continue;
                }
            };
            for (slot, reference) in &product.images {
                let Some(asset_id) = reference.asset_id() else {
                    // Legacy slots carry no asset id to resolve.
                    continue;
                };
                match self.assets.find_by_asset_id(asset_id).await {
                    Ok(Some(_)) => {}
                    Ok(None) => match self.products.clear_slot(&id, *slot).await {
                        Ok(()) => {
                            result.invalid_references += 1;
                            info!(product_id = %id, slot = %slot, "dangling slot reference unset");
                        }
                        Err(err) => result
                            .errors
                            .push(format!("slot clear failed for {id}/{slot}: {err}")),
                    },
                    Err(err) => result
                        .errors
                        .push(format!("asset lookup failed for {asset_id}: {err}")),
                }
            }
        }
        Ok(())
    }
}
