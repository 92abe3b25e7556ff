// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod batch;
mod checker;
mod keys;
mod memory_repo;
mod origin;
mod repair;
mod repo;
mod service;
mod sqlite_repo;
mod sweeper;

pub const CRATE_NAME: &str = "vitrine-images";

pub use batch::{OriginBatchReport, OriginImageDescriptor, OriginSlotOutcome};
pub use keys::{derive_object_key, object_key_from_url, PRODUCTS_KEY_PREFIX};
pub use memory_repo::MemoryCatalog;
pub use origin::{FakeOrigin, HttpOriginClient, OriginDownloader, OriginError};
pub use repo::{ImageAssetRepository, ProductRepository, RepoError};
pub use service::{ImageService, IngestRequest, SlotImage};
pub use sqlite_repo::{SqliteCatalog, SQLITE_SCHEMA_VERSION};

use std::fmt::{Display, Formatter};
use vitrine_model::ValidationError;
use vitrine_store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageErrorCode {
    Validation,
    NotFound,
    Storage,
    Origin,
    Repository,
    Internal,
}

impl ImageErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::Storage => "storage_error",
            Self::Origin => "origin_error",
            Self::Repository => "repository_error",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageError {
    pub code: ImageErrorCode,
    pub message: String,
}

impl ImageError {
    #[must_use]
    pub fn new(code: ImageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ImageError {}

impl From<ValidationError> for ImageError {
    fn from(err: ValidationError) -> Self {
        Self::new(ImageErrorCode::Validation, err.0)
    }
}

impl From<StoreError> for ImageError {
    fn from(err: StoreError) -> Self {
        Self::new(ImageErrorCode::Storage, err.to_string())
    }
}

impl From<RepoError> for ImageError {
    fn from(err: RepoError) -> Self {
        Self::new(ImageErrorCode::Repository, err.0)
    }
}

impl From<OriginError> for ImageError {
    fn from(err: OriginError) -> Self {
        Self::new(ImageErrorCode::Origin, err.0)
    }
}
