// SPDX-License-Identifier: Apache-2.0

use crate::repo::{ImageAssetRepository, ProductRepository, RepoError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tokio::sync::Mutex;
use vitrine_model::{ImageAsset, ImageSlot, Product, ProductId, SlotRef};

pub const SQLITE_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed product and asset repositories. Records are stored as JSON
/// documents with the lookup columns broken out and indexed; the two
/// uniqueness invariants live in the schema itself.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> Result<Self, RepoError> {
        let conn = Connection::open(path).map_err(|e| RepoError(e.to_string()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepoError> {
        let conn = Connection::open_in_memory().map_err(|e| RepoError(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, RepoError> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| RepoError(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| RepoError(e.to_string()))?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS products (
              id TEXT PRIMARY KEY,
              doc TEXT NOT NULL
            ) WITHOUT ROWID;
            CREATE TABLE IF NOT EXISTS image_assets (
              asset_id TEXT PRIMARY KEY,
              product_id TEXT NOT NULL,
              slot TEXT NOT NULL,
              bucket TEXT NOT NULL,
              object_key TEXT NOT NULL,
              content_hash TEXT NOT NULL,
              doc TEXT NOT NULL,
              UNIQUE (product_id, slot),
              UNIQUE (bucket, object_key)
            );
            CREATE INDEX IF NOT EXISTS idx_image_assets_content_hash
              ON image_assets(content_hash);
            ",
        )
        .map_err(|e| RepoError(e.to_string()))?;
        conn.pragma_update(None, "user_version", SQLITE_SCHEMA_VERSION)
            .map_err(|e| RepoError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn decode_product(doc: &str) -> Result<Product, RepoError> {
        serde_json::from_str(doc).map_err(|e| RepoError(format!("product decode failed: {e}")))
    }

    fn decode_asset(doc: &str) -> Result<ImageAsset, RepoError> {
        serde_json::from_str(doc).map_err(|e| RepoError(format!("asset decode failed: {e}")))
    }
}

#[async_trait]
impl ProductRepository for SqliteCatalog {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepoError> {
        let conn = self.conn.lock().await;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM products WHERE id = ?1",
                params![id.as_str()],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| RepoError(e.to_string()))?;
        doc.map(|d| Self::decode_product(&d)).transpose()
    }

    async fn exists(&self, id: &ProductId) -> Result<bool, RepoError> {
        let conn = self.conn.lock().await;
        let hit: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM products WHERE id = ?1",
                params![id.as_str()],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| RepoError(e.to_string()))?;
        Ok(hit.is_some())
    }

    async fn put(&self, product: &Product) -> Result<(), RepoError> {
        let doc = serde_json::to_string(product)
            .map_err(|e| RepoError(format!("product encode failed: {e}")))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO products (id, doc) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
            params![product.id.as_str(), doc],
        )
        .map_err(|e| RepoError(e.to_string()))?;
        Ok(())
    }

    async fn set_slot(
        &self,
        id: &ProductId,
        slot: ImageSlot,
        reference: SlotRef,
    ) -> Result<(), RepoError> {
        let mut product = self
            .get(id)
            .await?
            .ok_or_else(|| RepoError(format!("product {id} not found")))?;
        product.set_slot(slot, reference);
        self.put(&product).await
    }

    async fn clear_slot(&self, id: &ProductId, slot: ImageSlot) -> Result<(), RepoError> {
        if let Some(mut product) = self.get(id).await? {
            product.clear_slot(slot);
            self.put(&product).await?;
        }
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<ProductId>, RepoError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT id FROM products ORDER BY id")
            .map_err(|e| RepoError(e.to_string()))?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .map_err(|e| RepoError(e.to_string()))?;
        let mut out = Vec::new();
        for raw in rows {
            let raw = raw.map_err(|e| RepoError(e.to_string()))?;
            out.push(ProductId::parse(&raw).map_err(|e| RepoError(e.0))?);
        }
        Ok(out)
    }
}

#[async_trait]
impl ImageAssetRepository for SqliteCatalog {
    async fn find_by_product_slot(
        &self,
        id: &ProductId,
        slot: ImageSlot,
    ) -> Result<Option<ImageAsset>, RepoError> {
        let conn = self.conn.lock().await;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM image_assets WHERE product_id = ?1 AND slot = ?2",
                params![id.as_str(), slot.as_str()],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| RepoError(e.to_string()))?;
        doc.map(|d| Self::decode_asset(&d)).transpose()
    }

    async fn find_by_asset_id(&self, asset_id: &str) -> Result<Option<ImageAsset>, RepoError> {
        let conn = self.conn.lock().await;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM image_assets WHERE asset_id = ?1",
                params![asset_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| RepoError(e.to_string()))?;
        doc.map(|d| Self::decode_asset(&d)).transpose()
    }

    async fn find_by_object_key(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ImageAsset>, RepoError> {
        let conn = self.conn.lock().await;
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM image_assets WHERE bucket = ?1 AND object_key = ?2",
                params![bucket, key],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| RepoError(e.to_string()))?;
        doc.map(|d| Self::decode_asset(&d)).transpose()
    }

    async fn find_by_content_hash(&self, hash: &str) -> Result<Vec<ImageAsset>, RepoError> {
        if hash.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT doc FROM image_assets WHERE content_hash = ?1")
            .map_err(|e| RepoError(e.to_string()))?;
        let rows = stmt
            .query_map(params![hash], |r| r.get::<_, String>(0))
            .map_err(|e| RepoError(e.to_string()))?;
        let mut out = Vec::new();
        for doc in rows {
            out.push(Self::decode_asset(
                &doc.map_err(|e| RepoError(e.to_string()))?,
            )?);
        }
        Ok(out)
    }

    async fn upsert(&self, asset: &ImageAsset) -> Result<(), RepoError> {
        let doc = serde_json::to_string(asset)
            .map_err(|e| RepoError(format!("asset encode failed: {e}")))?;
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(|e| RepoError(e.to_string()))?;
        let owner: Option<(String, String, String)> = tx
            .query_row(
                "SELECT asset_id, product_id, slot FROM image_assets
                 WHERE bucket = ?1 AND object_key = ?2",
                params![asset.bucket, asset.object_key],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()
            .map_err(|e| RepoError(e.to_string()))?;
        if let Some((owner_id, owner_product, owner_slot)) = owner {
            if owner_product != asset.product_id.as_str() || owner_slot != asset.slot.as_str() {
                return Err(RepoError(format!(
                    "object key {}/{} already owned by asset {owner_id}",
                    asset.bucket, asset.object_key
                )));
            }
        }
        tx.execute(
            "DELETE FROM image_assets WHERE product_id = ?1 AND slot = ?2",
            params![asset.product_id.as_str(), asset.slot.as_str()],
        )
        .map_err(|e| RepoError(e.to_string()))?;
        tx.execute(
            "INSERT INTO image_assets
               (asset_id, product_id, slot, bucket, object_key, content_hash, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                asset.asset_id,
                asset.product_id.as_str(),
                asset.slot.as_str(),
                asset.bucket,
                asset.object_key,
                asset.content_hash,
                doc
            ],
        )
        .map_err(|e| RepoError(e.to_string()))?;
        tx.commit().map_err(|e| RepoError(e.to_string()))
    }

    async fn delete(&self, asset_id: &str) -> Result<bool, RepoError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "DELETE FROM image_assets WHERE asset_id = ?1",
                params![asset_id],
            )
            .map_err(|e| RepoError(e.to_string()))?;
        Ok(changed > 0)
    }

    async fn list_by_product(&self, id: &ProductId) -> Result<Vec<ImageAsset>, RepoError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT doc FROM image_assets WHERE product_id = ?1 ORDER BY slot")
            .map_err(|e| RepoError(e.to_string()))?;
        let rows = stmt
            .query_map(params![id.as_str()], |r| r.get::<_, String>(0))
            .map_err(|e| RepoError(e.to_string()))?;
        let mut out = Vec::new();
        for doc in rows {
            out.push(Self::decode_asset(
                &doc.map_err(|e| RepoError(e.to_string()))?,
            )?);
        }
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<ImageAsset>, RepoError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT doc FROM image_assets ORDER BY asset_id")
            .map_err(|e| RepoError(e.to_string()))?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .map_err(|e| RepoError(e.to_string()))?;
        let mut out = Vec::new();
        for doc in rows {
            out.push(Self::decode_asset(
                &doc.map_err(|e| RepoError(e.to_string()))?,
            )?);
        }
        Ok(out)
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
            file_size: 3,
            mime_type: "image/jpeg".to_string(),
            width: Some(10),
            height: Some(20),
            public_url: format!("https://cdn.example/catalog/{key}"),
            thumbnails: Vec::new(),
            content_hash: "h1".to_string(),
            sync_status: SyncStatus::Synced,
            sync_attempts: 1,
            last_sync_time: Some(5),
            product_exists: true,
            file_exists: true,
            is_active: true,
            is_public: true,
            source: AssetSource::Origin,
            origin_token: Some("tok".to_string()),
            created_at: 5,
        }
    }

    #[tokio::test]
    async fn asset_round_trips_through_document_column() {
        let repo = SqliteCatalog::open_in_memory().unwrap();
        let a = asset("a1", "p-1", ImageSlot::Front, "k1");
        repo.upsert(&a).await.unwrap();
        let found = repo.find_by_asset_id("a1").await.unwrap().unwrap();
        assert_eq!(found, a);
        let by_hash = repo.find_by_content_hash("h1").await.unwrap();
        assert_eq!(by_hash.len(), 1);
    }

    #[tokio::test]
    async fn product_slot_pair_stays_unique_across_upserts() {
        let repo = SqliteCatalog::open_in_memory().unwrap();
        repo.upsert(&asset("a1", "p-1", ImageSlot::Front, "k1"))
            .await
            .unwrap();
        repo.upsert(&asset("a2", "p-1", ImageSlot::Front, "k2"))
            .await
            .unwrap();
        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].asset_id, "a2");
        assert!(repo.find_by_asset_id("a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn object_key_collision_is_rejected() {
        let repo = SqliteCatalog::open_in_memory().unwrap();
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
    async fn on_disk_catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let repo = SqliteCatalog::open(&path).unwrap();
            repo.upsert(&asset("a1", "p-1", ImageSlot::Front, "k1"))
                .await
                .unwrap();
            let pid = ProductId::parse("p-1").unwrap();
            repo.put(&Product::new(pid, "oolong")).await.unwrap();
        }
        let repo = SqliteCatalog::open(&path).unwrap();
        let found = repo.find_by_asset_id("a1").await.unwrap().unwrap();
        assert_eq!(found.object_key, "k1");
        let pid = ProductId::parse("p-1").unwrap();
        assert!(ProductRepository::exists(&repo, &pid).await.unwrap());
    }

    #[tokio::test]
    async fn products_round_trip_with_slots() {
        let repo = SqliteCatalog::open_in_memory().unwrap();
        let pid = ProductId::parse("p-9").unwrap();
        let mut p = Product::new(pid.clone(), "oolong");
        p.set_slot(ImageSlot::Label, SlotRef::Legacy("http://x/l.jpg".into()));
        repo.put(&p).await.unwrap();
        assert!(ProductRepository::exists(&repo, &pid).await.unwrap());
        let got = ProductRepository::get(&repo, &pid).await.unwrap().unwrap();
        assert_eq!(got, p);
        repo.clear_slot(&pid, ImageSlot::Label).await.unwrap();
        let got = ProductRepository::get(&repo, &pid).await.unwrap().unwrap();
        assert!(got.slot(ImageSlot::Label).is_none());
    }
}
