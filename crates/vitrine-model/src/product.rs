use crate::slot::{ImageSlot, SlotRef};
use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const PRODUCT_ID_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ValidationError("product id must not be empty".to_string()));
        }
        if s.len() > PRODUCT_ID_MAX_LEN {
            return Err(ValidationError(format!(
                "product id exceeds max length {PRODUCT_ID_MAX_LEN}"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError(
                "product id must match [A-Za-z0-9_-]+".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog product as the image subsystem sees it. The catalog importer owns
/// everything else about the record; only the image slots are mutated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<ImageSlot, SlotRef>,
}

impl Product {
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            images: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn slot(&self, slot: ImageSlot) -> Option<&SlotRef> {
        self.images.get(&slot)
    }

    pub fn set_slot(&mut self, slot: ImageSlot, reference: SlotRef) {
        self.images.insert(slot, reference);
    }

    /// Unsets a slot, leaving it empty and eligible for re-ingestion.
    pub fn clear_slot(&mut self, slot: ImageSlot) -> Option<SlotRef> {
        self.images.remove(&slot)
    }

    #[must_use]
    pub fn populated_slots(&self) -> Vec<ImageSlot> {
        self.images.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_rejects_bad_charset_and_length() {
        assert!(ProductId::parse("p/1").is_err());
        assert!(ProductId::parse("").is_err());
        assert!(ProductId::parse(&"x".repeat(PRODUCT_ID_MAX_LEN + 1)).is_err());
        assert_eq!(ProductId::parse(" p-1 ").unwrap().as_str(), "p-1");
    }

    #[test]
    fn slots_set_and_clear() {
        let mut p = Product::new(ProductId::parse("p-1").unwrap(), "tea");
        p.set_slot(ImageSlot::Front, SlotRef::Legacy("http://x/a.jpg".into()));
        assert_eq!(p.populated_slots(), vec![ImageSlot::Front]);
        assert!(p.clear_slot(ImageSlot::Front).is_some());
        assert!(p.slot(ImageSlot::Front).is_none());
    }
}
