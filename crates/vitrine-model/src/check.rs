use crate::slot::ImageSlot;
use crate::ProductId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The five independent drift signals for one populated slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIssues {
    pub product_record_missing: bool,
    pub image_record_missing: bool,
    pub file_not_exists: bool,
    pub url_mismatch: bool,
    pub metadata_mismatch: bool,
}

impl CheckIssues {
    #[must_use]
    pub const fn any(self) -> bool {
        self.product_record_missing
            || self.image_record_missing
            || self.file_not_exists
            || self.url_mismatch
            || self.metadata_mismatch
    }
}

/// First matching rule wins: missing product or missing file is critical,
/// a missing or diverged record is high, stale embedded metadata is medium.
#[must_use]
pub fn severity_for(issues: CheckIssues) -> Severity {
    if issues.product_record_missing || issues.file_not_exists {
        Severity::Critical
    } else if issues.image_record_missing || issues.url_mismatch {
        Severity::High
    } else if issues.metadata_mismatch {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// One human-readable action per raised flag; the repair engine dispatches
/// off the flags themselves, these strings are for operators and audits.
#[must_use]
pub fn suggested_actions(issues: CheckIssues) -> Vec<String> {
    let mut actions = Vec::new();
    if issues.product_record_missing {
        actions.push("restore or re-import the product record".to_string());
    }
    if issues.image_record_missing {
        actions.push("synthesize an image asset from the product slot data".to_string());
    }
    if issues.file_not_exists {
        actions.push("re-download the object from the origin source".to_string());
    }
    if issues.url_mismatch {
        actions.push("re-sync the product slot URL from the image asset".to_string());
    }
    if issues.metadata_mismatch {
        actions.push("re-sync the product slot metadata from the image asset".to_string());
    }
    actions
}

/// Per-slot comparison between a product reference, its image asset, and
/// storage reality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyCheck {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<ImageSlot>,
    pub issues: CheckIssues,
    pub severity: Severity,
    pub suggested_actions: Vec<String>,
}

impl ConsistencyCheck {
    #[must_use]
    pub fn new(product_id: ProductId, slot: Option<ImageSlot>, issues: CheckIssues) -> Self {
        Self {
            product_id,
            slot,
            issues,
            severity: severity_for(issues),
            suggested_actions: suggested_actions(issues),
        }
    }
}

/// Aggregate counts by severity, returned alongside validate responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl CheckSummary {
    #[must_use]
    pub fn from_checks(checks: &[ConsistencyCheck]) -> Self {
        let mut out = Self {
            total: checks.len(),
            ..Self::default()
        };
        for check in checks {
            match check.severity {
                Severity::Critical => out.critical += 1,
                Severity::High => out.high += 1,
                Severity::Medium => out.medium += 1,
                Severity::Low => out.low += 1,
            }
        }
        out
    }
}
