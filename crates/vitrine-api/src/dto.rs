// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use vitrine_model::{CheckSummary, ConsistencyCheck, ImageSlot};

/// Validate endpoint payload: per-slot checks plus severity counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateData {
    pub checks: Vec<ConsistencyCheck>,
    pub summary: CheckSummary,
}

impl ValidateData {
    #[must_use]
    pub fn from_checks(checks: Vec<ConsistencyCheck>) -> Self {
        let summary = CheckSummary::from_checks(&checks);
        Self { checks, summary }
    }
}

/// One slot in a batch upload; bytes travel base64-encoded in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadItem {
    pub slot: ImageSlot,
    pub file_name: String,
    pub content_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadRequest {
    pub images: Vec<BatchUploadItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub slot: ImageSlot,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadReport {
    pub uploaded: u32,
    pub failed: u32,
    pub outcomes: Vec<UploadOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_model::{CheckIssues, ProductId, Severity};

    #[test]
    fn validate_data_carries_summary_counts() {
        let pid = ProductId::parse("p-1").unwrap();
        let checks = vec![ConsistencyCheck::new(
            pid,
            Some(ImageSlot::Front),
            CheckIssues {
                file_not_exists: true,
                ..CheckIssues::default()
            },
        )];
        let data = ValidateData::from_checks(checks);
        assert_eq!(data.summary.total, 1);
        assert_eq!(data.summary.critical, 1);
        assert_eq!(data.checks[0].severity, Severity::Critical);
    }

    #[test]
    fn batch_request_wire_shape() {
        let raw = r#"{"images":[{"slot":"front","fileName":"a.jpg","contentBase64":"aGk="}]}"#;
        let parsed: BatchUploadRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.images.len(), 1);
        assert_eq!(parsed.images[0].slot, ImageSlot::Front);
        assert!(parsed.images[0].mime_type.is_none());
    }
}
