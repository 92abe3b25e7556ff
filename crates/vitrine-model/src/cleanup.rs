use serde::{Deserialize, Serialize};

/// Outcome of one orphan sweep. Per-item failures land in `errors` and
/// never abort the remaining passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    /// Image assets deleted because their owning product no longer exists.
    pub orphaned_images: u32,
    /// Storage objects removed because no asset record pointed at them.
    pub orphaned_objects: u32,
    /// Product slots unset because their asset id resolved to nothing.
    pub invalid_references: u32,
    pub freed_bytes: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// True when the sweep stopped early on an interrupt request.
    #[serde(default)]
    pub interrupted: bool,
}
