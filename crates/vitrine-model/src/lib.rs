// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod asset;
mod check;
mod cleanup;
mod product;
mod repair;
mod slot;
mod upload;

pub const CRATE_NAME: &str = "vitrine-model";

pub use asset::{AssetSource, ImageAsset, SyncStatus, Thumbnail};
pub use check::{
    severity_for, suggested_actions, CheckIssues, CheckSummary, ConsistencyCheck, Severity,
};
pub use cleanup::CleanupResult;
pub use product::{Product, ProductId, PRODUCT_ID_MAX_LEN};
pub use repair::{RepairAction, RepairDetail, RepairResult};
pub use slot::{ImageSlot, SlotRef, StructuredRef};
pub use upload::{
    infer_mime_from_name, sanitize_filename, validate_upload, ALLOWED_MIME_TYPES, MAX_IMAGE_BYTES,
};

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}
