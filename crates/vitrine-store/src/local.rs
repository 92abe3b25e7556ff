use crate::{AssetStore, ObjectMeta, StoreError, StoreErrorCode};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem-backed object store: `{root}/{bucket}/{key}`. Writes go
/// through a temp file plus rename so readers never observe partial objects.
pub struct LocalFsStore {
    root: PathBuf,
    public_base: String,
}

impl LocalFsStore {
    #[must_use]
    pub fn new(root: PathBuf, public_base: impl Into<String>) -> Self {
        Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        Ok(self.root.join(bucket).join(key))
    }

    /// Refuses reads that escape the store root via symlinks or dot
    /// segments that survived key validation.
    fn read_safe(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let parent = path.parent().ok_or_else(|| {
            StoreError::new(StoreErrorCode::Validation, "object path has no parent")
        })?;
        let canonical_parent = parent
            .canonicalize()
            .map_err(|e| StoreError::new(StoreErrorCode::NotFound, format!("stat failed: {e}")))?;
        if !canonical_parent.starts_with(&root) {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "path traversal blocked",
            ));
        }
        fs::read(path)
            .map_err(|e| StoreError::new(StoreErrorCode::NotFound, format!("read failed: {e}")))
    }
}

fn validate_bucket(bucket: &str) -> Result<(), StoreError> {
    if bucket.is_empty()
        || !bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::new(
            StoreErrorCode::Validation,
            format!("invalid bucket name '{bucket}'"),
        ));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(StoreError::new(
            StoreErrorCode::Validation,
            format!("invalid object key '{key}'"),
        ));
    }
    Ok(())
}

fn collect_objects(
    dir: &Path,
    bucket_root: &Path,
    out: &mut Vec<ObjectMeta>,
) -> Result<(), StoreError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| StoreError::new(StoreErrorCode::Io, format!("list failed: {e}")))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| StoreError::new(StoreErrorCode::Io, format!("list failed: {e}")))?;
        let path = entry.path();
        if path.is_dir() {
            collect_objects(&path, bucket_root, out)?;
        } else if let Ok(rel) = path.strip_prefix(bucket_root) {
            let meta = entry
                .metadata()
                .map_err(|e| StoreError::new(StoreErrorCode::Io, format!("stat failed: {e}")))?;
            out.push(ObjectMeta {
                key: rel.to_string_lossy().replace('\\', "/"),
                size: meta.len(),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl AssetStore for LocalFsStore {
    fn backend_tag(&self) -> &'static str {
        "localfs"
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{bucket}/{key}", self.public_base)
    }

    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<ObjectMeta, StoreError> {
        let path = self.object_path(bucket, key)?;
        let parent = path.parent().ok_or_else(|| {
            StoreError::new(StoreErrorCode::Validation, "object path has no parent")
        })?;
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::new(StoreErrorCode::Io, format!("mkdir failed: {e}")))?;
        let tmp = path.with_extension("tmp-write");
        fs::write(&tmp, bytes)
            .map_err(|e| StoreError::new(StoreErrorCode::Io, format!("write failed: {e}")))?;
        fs::rename(&tmp, &path)
            .map_err(|e| StoreError::new(StoreErrorCode::Io, format!("rename failed: {e}")))?;
        Ok(ObjectMeta {
            key: key.to_string(),
            size: bytes.len() as u64,
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key)?;
        self.read_safe(&path)
    }

    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        let path = self.object_path(bucket, key)?;
        let meta = fs::metadata(&path).map_err(|_| StoreError::not_found(bucket, key))?;
        if !meta.is_file() {
            return Err(StoreError::not_found(bucket, key));
        }
        Ok(ObjectMeta {
            key: key.to_string(),
            size: meta.len(),
        })
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(bucket, key))
            }
            Err(e) => Err(StoreError::new(
                StoreErrorCode::Io,
                format!("remove failed: {e}"),
            )),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        validate_bucket(bucket)?;
        let bucket_root = self.root.join(bucket);
        if !bucket_root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        collect_objects(&bucket_root, &bucket_root, &mut out)?;
        out.retain(|m| m.key.starts_with(prefix));
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(root: &Path) -> LocalFsStore {
        LocalFsStore::new(root.to_path_buf(), "https://cdn.example")
    }

    #[tokio::test]
    async fn put_stat_get_remove_round_trip() {
        let dir = tempdir().expect("tempdir");
        let s = store(dir.path());
        let meta = s
            .put("catalog", "products/p-1/front/a.jpg", b"bytes")
            .await
            .expect("put");
        assert_eq!(meta.size, 5);
        let stat = s.stat("catalog", "products/p-1/front/a.jpg").await.expect("stat");
        assert_eq!(stat.size, 5);
        assert_eq!(
            s.get("catalog", "products/p-1/front/a.jpg").await.expect("get"),
            b"bytes"
        );
        s.remove("catalog", "products/p-1/front/a.jpg").await.expect("remove");
        let err = s.stat("catalog", "products/p-1/front/a.jpg").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let dir = tempdir().expect("tempdir");
        let s = store(dir.path());
        s.put("catalog", "products/p-1/front/a.jpg", b"1").await.expect("put");
        s.put("catalog", "products/p-1/back/b.jpg", b"22").await.expect("put");
        s.put("catalog", "products/p-2/front/c.jpg", b"333").await.expect("put");

        let all = s.list("catalog", "products/").await.expect("list");
        assert_eq!(all.len(), 3);
        let p1 = s.list("catalog", "products/p-1/").await.expect("list");
        assert_eq!(p1.len(), 2);
        assert!(p1.iter().all(|m| m.key.starts_with("products/p-1/")));
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let s = store(dir.path());
        for bad in ["../escape.jpg", "a//b.jpg", "/abs.jpg", "a/./b.jpg", ""] {
            let err = s.put("catalog", bad, b"x").await.unwrap_err();
            assert_eq!(err.code, StoreErrorCode::Validation, "key: {bad}");
        }
        assert!(s.put("cata/log", "a.jpg", b"x").await.is_err());
    }

    #[test]
    fn object_url_joins_base_bucket_and_key() {
        let dir = tempdir().expect("tempdir");
        let s = LocalFsStore::new(dir.path().to_path_buf(), "https://cdn.example/");
        assert_eq!(
            s.object_url("catalog", "products/p/front/a.jpg"),
            "https://cdn.example/catalog/products/p/front/a.jpg"
        );
    }
}
