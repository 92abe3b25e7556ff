use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use vitrine_model::{ImageAsset, ImageSlot, Product, ProductId, SlotRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoError(pub String);

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RepoError {}

/// Durable product records, as seen by the image subsystem. The catalog
/// importer owns the rest of the product; only slots are written here.
#[async_trait]
pub trait ProductRepository: Send + Sync + 'static {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepoError>;

    async fn exists(&self, id: &ProductId) -> Result<bool, RepoError>;

    /// Full-record upsert, used by catalog import and test seeding.
    async fn put(&self, product: &Product) -> Result<(), RepoError>;

    /// Overwrites one slot reference. Errors if the product is missing.
    async fn set_slot(
        &self,
        id: &ProductId,
        slot: ImageSlot,
        reference: SlotRef,
    ) -> Result<(), RepoError>;

    /// Unsets one slot, leaving it empty. Missing product or empty slot is
    /// not an error; the caller is cleaning up.
    async fn clear_slot(&self, id: &ProductId, slot: ImageSlot) -> Result<(), RepoError>;

    /// All product ids, for full-collection sweeps.
    async fn list_ids(&self) -> Result<Vec<ProductId>, RepoError>;
}

/// Durable image asset records. Implementations enforce the two uniqueness
/// invariants: one asset per `(product, slot)` and per `(bucket, key)`.
#[async_trait]
pub trait ImageAssetRepository: Send + Sync + 'static {
    async fn find_by_product_slot(
        &self,
        id: &ProductId,
        slot: ImageSlot,
    ) -> Result<Option<ImageAsset>, RepoError>;

    async fn find_by_asset_id(&self, asset_id: &str) -> Result<Option<ImageAsset>, RepoError>;

    async fn find_by_object_key(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ImageAsset>, RepoError>;

    /// Dedup lookup; callers decide what to do with matches.
    async fn find_by_content_hash(&self, hash: &str) -> Result<Vec<ImageAsset>, RepoError>;

    /// Insert-or-replace keyed on `(product_id, slot)`. Rejects a write
    /// whose `(bucket, object_key)` already belongs to a different slot.
    async fn upsert(&self, asset: &ImageAsset) -> Result<(), RepoError>;

    /// Returns false when the record was already gone.
    async fn delete(&self, asset_id: &str) -> Result<bool, RepoError>;

    async fn list_by_product(&self, id: &ProductId) -> Result<Vec<ImageAsset>, RepoError>;

    /// Every record, for full-collection sweeps.
    async fn list_all(&self) -> Result<Vec<ImageAsset>, RepoError>;
}
