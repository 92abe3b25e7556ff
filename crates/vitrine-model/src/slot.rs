use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Named image role on a product. The set is closed: the catalog import
/// defines exactly these five fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    Front,
    Back,
    Label,
    Package,
    Gift,
}

impl ImageSlot {
    pub const ALL: [ImageSlot; 5] = [
        ImageSlot::Front,
        ImageSlot::Back,
        ImageSlot::Label,
        ImageSlot::Package,
        ImageSlot::Gift,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Label => "label",
            Self::Package => "package",
            Self::Gift => "gift",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim() {
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            "label" => Ok(Self::Label),
            "package" => Ok(Self::Package),
            "gift" => Ok(Self::Gift),
            other => Err(ValidationError(format!(
                "unknown image slot '{other}' (expected front|back|label|package|gift)"
            ))),
        }
    }
}

impl Display for ImageSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured slot reference mirroring the key fields of an [`crate::ImageAsset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRef {
    pub asset_id: String,
    pub url: String,
    pub object_key: String,
    /// Unix millis of the last write to this reference.
    pub last_updated: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A product image slot is either a bare URL left behind by the legacy
/// importer or a structured reference written by the ingestion path.
/// Serialized untagged so both historical shapes round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotRef {
    Structured(StructuredRef),
    Legacy(String),
}

impl SlotRef {
    /// The single normalization point for reading a slot: the URL the
    /// storefront would render, regardless of shape.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Legacy(url) => url,
            Self::Structured(s) => &s.url,
        }
    }

    #[must_use]
    pub fn asset_id(&self) -> Option<&str> {
        match self {
            Self::Legacy(_) => None,
            Self::Structured(s) => Some(&s.asset_id),
        }
    }

    #[must_use]
    pub fn object_key(&self) -> Option<&str> {
        match self {
            Self::Legacy(_) => None,
            Self::Structured(s) => Some(&s.object_key),
        }
    }

    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_parse_round_trips_all_variants() {
        for slot in ImageSlot::ALL {
            assert_eq!(ImageSlot::parse(slot.as_str()).unwrap(), slot);
        }
        assert!(ImageSlot::parse("thumbnail").is_err());
    }

    #[test]
    fn slot_ref_deserializes_both_shapes() {
        let legacy: SlotRef = serde_json::from_str("\"https://cdn.example/a.jpg\"").unwrap();
        assert_eq!(legacy.url(), "https://cdn.example/a.jpg");
        assert!(legacy.asset_id().is_none());

        let structured: SlotRef = serde_json::from_str(
            r#"{"assetId":"img-1","url":"https://cdn.example/b.jpg","objectKey":"products/p/front/x.jpg","lastUpdated":1}"#,
        )
        .unwrap();
        assert_eq!(structured.asset_id(), Some("img-1"));
        assert_eq!(structured.object_key(), Some("products/p/front/x.jpg"));
    }
}
