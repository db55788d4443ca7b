//! Grocery item intents supplied by the caller.
//!
//! Items arrive as loose JSON written by humans (or by an agent relaying
//! humans), so intake is deliberately lenient: a bare string is a name,
//! quantity key spellings vary, and quantities below one are clamped.

use serde::{Deserialize, Serialize};

use crate::types::id::{PicnicProductId, ProductId};

/// A requested grocery item, possibly pinned to explicit product ids.
///
/// When both `ah_id` and `picnic_id` are present, matching is skipped for
/// this item entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroceryItem {
    /// Free-text item name; the search query when no ids are given.
    pub name: Option<String>,
    /// Requested quantity, always at least 1.
    pub qty: u32,
    /// Explicit Albert Heijn product id.
    pub ah_id: Option<ProductId>,
    /// Explicit Picnic product id.
    pub picnic_id: Option<PicnicProductId>,
    /// Optional brand hint for the matcher.
    pub brand: Option<String>,
    /// Optional unit/size hint for the matcher (e.g. "1 l", "500 g").
    pub unit_hint: Option<String>,
}

impl GroceryItem {
    /// Build an item from just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            qty: 1,
            ah_id: None,
            picnic_id: None,
            brand: None,
            unit_hint: None,
        }
    }

    /// Whether explicit ids make searching unnecessary.
    #[must_use]
    pub const fn has_explicit_ids(&self) -> bool {
        self.ah_id.is_some() && self.picnic_id.is_some()
    }

    /// The item name for display and error reporting.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

// Lenient wire representation. A bare JSON string is shorthand for a
// named item with quantity 1.
#[derive(Deserialize)]
#[serde(untagged)]
enum ItemRepr {
    Bare(String),
    Full(ItemFields),
}

#[derive(Deserialize)]
struct ItemFields {
    name: Option<String>,
    #[serde(alias = "quantity", default)]
    qty: Option<u32>,
    #[serde(alias = "ah_product_id", alias = "ahProductId")]
    ah_id: Option<ProductId>,
    #[serde(alias = "picnic_product_id", alias = "picnicProductId")]
    picnic_id: Option<PicnicProductId>,
    brand: Option<String>,
    #[serde(alias = "unit", alias = "size")]
    unit_hint: Option<String>,
}

impl<'de> Deserialize<'de> for GroceryItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = ItemRepr::deserialize(deserializer)?;
        Ok(match repr {
            ItemRepr::Bare(name) => Self::named(name.trim()),
            ItemRepr::Full(fields) => Self {
                name: fields.name.map(|n| n.trim().to_string()),
                qty: fields.qty.unwrap_or(1).max(1),
                ah_id: fields.ah_id,
                picnic_id: fields.picnic_id,
                brand: fields.brand.map(|b| b.trim().to_string()),
                unit_hint: fields.unit_hint.map(|u| u.trim().to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_becomes_named_item() {
        let item: GroceryItem = serde_json::from_str("\"bananen\"").unwrap();
        assert_eq!(item.name.as_deref(), Some("bananen"));
        assert_eq!(item.qty, 1);
    }

    #[test]
    fn quantity_aliases_are_accepted() {
        let item: GroceryItem =
            serde_json::from_str(r#"{"name": "melk", "quantity": 3}"#).unwrap();
        assert_eq!(item.qty, 3);
    }

    #[test]
    fn zero_quantity_is_clamped_to_one() {
        let item: GroceryItem = serde_json::from_str(r#"{"name": "melk", "qty": 0}"#).unwrap();
        assert_eq!(item.qty, 1);
    }

    #[test]
    fn id_aliases_are_accepted() {
        let item: GroceryItem = serde_json::from_str(
            r#"{"name": "melk", "ahProductId": 1234, "picnicProductId": "s100"}"#,
        )
        .unwrap();
        assert_eq!(item.ah_id, Some(ProductId::new(1234)));
        assert_eq!(item.picnic_id, Some(PicnicProductId::new("s100")));
        assert!(item.has_explicit_ids());
    }

    #[test]
    fn one_explicit_id_is_not_enough_to_skip_matching() {
        let item: GroceryItem =
            serde_json::from_str(r#"{"name": "melk", "ah_id": 1234}"#).unwrap();
        assert!(!item.has_explicit_ids());
    }

    #[test]
    fn names_are_trimmed() {
        let item: GroceryItem = serde_json::from_str(r#"{"name": "  kaas "}"#).unwrap();
        assert_eq!(item.name.as_deref(), Some("kaas"));
    }
}
