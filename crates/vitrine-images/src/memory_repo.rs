use crate::repo::{ImageAssetRepository, ProductRepository, RepoError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use vitrine_model::{ImageAsset, ImageSlot, Product, ProductId, SlotRef};

/// In-memory product and asset repositories sharing one struct, for tests
/// and embedded runs. Uniqueness invariants are enforced the same way the
/// SQLite implementation enforces them with indexes.
#[derive(Default)]
pub struct MemoryCatalog {
    products: RwLock<BTreeMap<ProductId, Product>>,
    assets: RwLock<BTreeMap<String, ImageAsset>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn asset_count(&self) -> usize {
        self.assets.read().await.len()
    }

    /// Drops a product record without touching its assets, simulating the
    /// upstream importer deleting a product behind the service's back.
    pub async fn remove_product(&self, id: &ProductId) -> bool {
        self.products.write().await.remove(id).is_some()
    }
}

#[async_trait]
impl ProductRepository for MemoryCatalog {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepoError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn exists(&self, id: &ProductId) -> Result<bool, RepoError> {
        Ok(self.products.read().await.contains_key(id))
    }

    async fn put(&self, product: &Product) -> Result<(), RepoError> {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn set_slot(
        &self,
        id: &ProductId,
        slot: ImageSlot,
        reference: SlotRef,
    ) -> Result<(), RepoError> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(id)
            .ok_or_else(|| RepoError(format!("product {id} not found")))?;
        product.set_slot(slot, reference);
        Ok(())
    }

    async fn clear_slot(&self, id: &ProductId, slot: ImageSlot) -> Result<(), RepoError> {
        if let Some(product) = self.products.write().await.get_mut(id) {
            product.clear_slot(slot);
        }
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<ProductId>, RepoError> {
        Ok(self.products.read().await.keys().cloned().collect())
    }
}

#[async_trait]
impl ImageAssetRepository for MemoryCatalog {
    async fn find_by_product_slot(
        &self,
        id: &ProductId,
        slot: ImageSlot,
    ) -> Result<Option<ImageAsset>, RepoError> {
        Ok(self
            .assets
            .read()
            .await
            .values()
            .find(|a| &a.product_id == id && a.slot == slot)
            .cloned())
    }

    async fn find_by_asset_id(&self, asset_id: &str) -> Result<Option<ImageAsset>, RepoError> {
        Ok(self.assets.read().await.get(asset_id).cloned())
    }

    async fn find_by_object_key(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ImageAsset>, RepoError> {
        Ok(self
            .assets
            .read()
            .await
            .values()
            .find(|a| a.bucket == bucket && a.object_key == key)
            .cloned())
    }

    async fn find_by_content_hash(&self, hash: &str) -> Result<Vec<ImageAsset>, RepoError> {
        if hash.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .assets
            .read()
            .await
            .values()
            .filter(|a| a.content_hash == hash)
            .cloned()
            .collect())
    }

    async fn upsert(&self, asset: &ImageAsset) -> Result<(), RepoError> {
        let mut assets = self.assets.write().await;
        if let Some(clash) = assets.values().find(|a| {
            a.bucket == asset.bucket
                && a.object_key == asset.object_key
                && !(a.product_id == asset.product_id && a.slot == asset.slot)
        }) {
            return Err(RepoError(format!(
                "object key {}/{} already owned by asset {}",
                asset.bucket, asset.object_key, clash.asset_id
            )));
        }
        // (product, slot) replacement may change the asset id; drop the old
        // record so the pair stays unique.
        let replaced: Vec<String> = assets
            .values()
            .filter(|a| {
                a.product_id == asset.product_id
                    && a.slot == asset.slot
                    && a.asset_id != asset.asset_id
            })
            .map(|a| a.asset_id.clone())
            .collect();
        for id in replaced {
            assets.remove(&id);
        }
        assets.insert(asset.asset_id.clone(), asset.clone());
        Ok(())
    }

    async fn delete(&self, asset_id: &str) -> Result<bool, RepoError> {
        Ok(self.assets.write().await.remove(asset_id).is_some())
    }

    async fn list_by_product(&self, id: &ProductId) -> Result<Vec<ImageAsset>, RepoError> {
        Ok(self
            .assets
            .read()
            .await
            .values()
            .filter(|a| &a.product_id == id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ImageAsset>, RepoError> {
        Ok(self.assets.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_model::{AssetSource, SyncStatus};

    fn asset(id: &str, pid: &str, slot: ImageSlot, key: &str) -> ImageAsset {
        ImageAsset {
            asset_id: id.to_string(),
            product_id: ProductId::parse(pid).unwrap(),
            slot,
            bucket: "catalog".to_string(),
            object_key: key.to_string(),
            original_name: "a.jpg".to_string(),
            file_size: 1,
            mime_type: "image/jpeg".to_string(),
            width: None,
            height: None,
            public_url: format!("memory://catalog/{key}"),
            thumbnails: Vec::new(),
            content_hash: "h".to_string(),
            sync_status: SyncStatus::Synced,
            sync_attempts: 1,
            last_sync_time: None,
            product_exists: true,
            file_exists: true,
            is_active: true,
            is_public: true,
            source: AssetSource::Upload,
            origin_token: None,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_product_slot_pair() {
        let repo = MemoryCatalog::new();
        repo.upsert(&asset("a1", "p-1", ImageSlot::Front, "k1"))
            .await
            .unwrap();
        repo.upsert(&asset("a2", "p-1", ImageSlot::Front, "k2"))
            .await
            .unwrap();
        assert_eq!(repo.asset_count().await, 1);
        let found = repo
            .find_by_product_slot(&ProductId::parse("p-1").unwrap(), ImageSlot::Front)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.asset_id, "a2");
    }

    #[tokio::test]
    async fn upsert_rejects_object_key_owned_elsewhere() {
        let repo = MemoryCatalog::new();
        repo.upsert(&asset("a1", "p-1", ImageSlot::Front, "k1"))
            .await
            .unwrap();
        let err = repo
            .upsert(&asset("a2", "p-2", ImageSlot::Back, "k1"))
            .await
            .unwrap_err();
        assert!(err.0.contains("already owned"));
    }

    #[tokio::test]
    async fn set_slot_requires_existing_product() {
        let repo = MemoryCatalog::new();
        let pid = ProductId::parse("p-1").unwrap();
        let err = repo
            .set_slot(&pid, ImageSlot::Front, SlotRef::Legacy("u".into()))
            .await
            .unwrap_err();
        assert!(err.0.contains("not found"));
        repo.put(&Product::new(pid.clone(), "tea")).await.unwrap();
        repo.set_slot(&pid, ImageSlot::Front, SlotRef::Legacy("u".into()))
            .await
            .unwrap();
        assert!(repo.get(&pid).await.unwrap().unwrap().slot(ImageSlot::Front).is_some());
    }
}
