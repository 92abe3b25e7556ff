// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod dto;
mod envelope;

pub const CRATE_NAME: &str = "vitrine-api";

pub use dto::{BatchUploadItem, BatchUploadReport, BatchUploadRequest, UploadOutcome, ValidateData};
pub use envelope::ApiEnvelope;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidParameter,
    ValidationFailed,
    NotFound,
    PayloadTooLarge,
    OriginUnavailable,
    StorageUnavailable,
    NotReady,
    Timeout,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: json!({}),
        }
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self {
            code: ApiErrorCode::InvalidParameter,
            message: format!("invalid parameter: {name}"),
            details: json!({"parameter": name, "value": value}),
        }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, what)
    }
}

/// HTTP status for each error code. Storage and origin outages are marked
/// retryable; everything unclassified is a 500.
#[must_use]
pub fn status_for(code: ApiErrorCode) -> u16 {
    match code {
        ApiErrorCode::InvalidParameter | ApiErrorCode::ValidationFailed => 400,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::OriginUnavailable => 502,
        ApiErrorCode::StorageUnavailable | ApiErrorCode::NotReady => 503,
        ApiErrorCode::Timeout => 504,
        ApiErrorCode::Internal => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_the_taxonomy() {
        assert_eq!(status_for(ApiErrorCode::ValidationFailed), 400);
        assert_eq!(status_for(ApiErrorCode::NotFound), 404);
        assert_eq!(status_for(ApiErrorCode::PayloadTooLarge), 413);
        assert_eq!(status_for(ApiErrorCode::StorageUnavailable), 503);
        assert_eq!(status_for(ApiErrorCode::OriginUnavailable), 502);
        assert_eq!(status_for(ApiErrorCode::Timeout), 504);
        assert_eq!(status_for(ApiErrorCode::Internal), 500);
    }

    #[test]
    fn error_details_schema_stable() {
        let e = ApiError::invalid_param("slot", "side");
        assert!(e.details.get("parameter").is_some());
        assert!(e.details.get("value").is_some());
        let wire = serde_json::to_value(&e).unwrap();
        assert_eq!(wire["code"], "invalid_parameter");
    }
}
