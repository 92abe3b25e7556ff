// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod local;
mod memory;
mod retry;

pub use local::LocalFsStore;
pub use memory::MemoryStore;
pub use retry::{BackoffPolicy, RetryPolicy};

use async_trait::async_trait;
use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "vitrine-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    Io,
    Unsupported,
    Internal,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Io => "io_error",
            Self::Unsupported => "unsupported",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::new(
            StoreErrorCode::NotFound,
            format!("object {bucket}/{key} does not exist"),
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.code, StoreErrorCode::NotFound)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
}

/// Bucket/key object storage as the image service consumes it. Backends are
/// expected to be safe for concurrent use behind an `Arc`.
#[async_trait]
pub trait AssetStore: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;

    /// Public URL a stored object is served from.
    fn object_url(&self, bucket: &str, key: &str) -> String;

    async fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<ObjectMeta, StoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Existence-plus-size probe; `NotFound` when the object is absent.
    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StoreError>;

    async fn remove(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError>;
}
