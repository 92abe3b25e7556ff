use crate::slot::ImageSlot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    Synthesize,
    Resync,
    Redownload,
    Noop,
}

impl RepairAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synthesize => "synthesize",
            Self::Resync => "resync",
            Self::Redownload => "redownload",
            Self::Noop => "noop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<ImageSlot>,
    pub action: RepairAction,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairResult {
    /// Actions that mutated state and succeeded. No-ops on an already
    /// consistent slot do not count.
    pub repaired: u32,
    pub failed: u32,
    pub details: Vec<RepairDetail>,
}

impl RepairResult {
    pub fn record_success(&mut self, slot: Option<ImageSlot>, action: RepairAction) {
        if action != RepairAction::Noop {
            self.repaired += 1;
        }
        self.details.push(RepairDetail {
            slot,
            action,
            success: true,
            error: None,
        });
    }

    pub fn record_failure(
        &mut self,
        slot: Option<ImageSlot>,
        action: RepairAction,
        error: impl Into<String>,
    ) {
        self.failed += 1;
        self.details.push(RepairDetail {
            slot,
            action,
            success: false,
            error: Some(error.into()),
        });
    }
}
