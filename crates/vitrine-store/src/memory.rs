use crate::{AssetStore, ObjectMeta, StoreError, StoreErrorCode};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// In-memory store for tests and embedded runs. Failure injection flags let
/// engine tests exercise the storage-error paths without a real backend.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    pub put_calls: AtomicU64,
    pub stat_calls: AtomicU64,
    pub fail_puts: AtomicBool,
    pub fail_stats: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops an object without going through `remove`, simulating external
    /// loss of the underlying file.
    pub async fn lose_object(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .await
            .remove(&(bucket.to_string(), key.to_string()))
            .is_some()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{bucket}/{key}")
    }

    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<ObjectMeta, StoreError> {
        self.put_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_puts.load(Ordering::Relaxed) {
            return Err(StoreError::new(
                StoreErrorCode::Io,
                "injected put failure",
            ));
        }
        self.objects
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        Ok(ObjectMeta {
            key: key.to_string(),
            size: bytes.len() as u64,
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError> {
        self.stat_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_stats.load(Ordering::Relaxed) {
            return Err(StoreError::new(
                StoreErrorCode::Io,
                "injected stat failure",
            ));
        }
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|bytes| ObjectMeta {
                key: key.to_string(),
                size: bytes.len() as u64,
            })
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.objects
            .lock()
            .await
            .remove(&(bucket.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        Ok(self
            .objects
            .lock()
            .await
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), bytes)| ObjectMeta {
                key: k.clone(),
                size: bytes.len() as u64,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_surface_as_io_errors() {
        let s = MemoryStore::new();
        s.fail_puts.store(true, Ordering::Relaxed);
        let err = s.put("b", "k", b"x").await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::Io);
        s.fail_puts.store(false, Ordering::Relaxed);
        s.put("b", "k", b"x").await.expect("put");
        assert_eq!(s.put_calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn lose_object_makes_stat_fail() {
        let s = MemoryStore::new();
        s.put("b", "k", b"x").await.expect("put");
        assert!(s.lose_object("b", "k").await);
        assert!(s.stat("b", "k").await.unwrap_err().is_not_found());
        assert!(!s.lose_object("b", "k").await);
    }
}
