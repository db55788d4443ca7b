//! Domain types for the Albert Heijn API.
//!
//! These types provide a clean, ergonomic API separate from the raw
//! backend payload shapes, which live here as `pub(crate)` wire structs.

use boodschap_core::{CartLine, CartSnapshot, EntityId, ListEntryId, Money, ProductId, Provider};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AhError;

// =============================================================================
// Products
// =============================================================================

/// An immutable product snapshot returned by search/detail calls.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    /// Numeric product id.
    pub id: ProductId,
    /// Product title.
    pub name: String,
    /// Brand name, when the backend reports one.
    pub brand: Option<String>,
    /// Package size as free text (e.g. "1 l", "per stuk").
    pub unit_size: Option<String>,
    /// Whether the product can currently be ordered.
    pub available: bool,
    /// Whether a promotional (bonus) price applies.
    pub is_bonus: bool,
    /// Promotion description (e.g. "2e halve prijs").
    pub bonus_mechanism: Option<String>,
    /// The currently charged price in euros. For bonus products this is
    /// already the promotional price.
    pub price_now: Option<Decimal>,
    /// Reference price before the bonus. Informational only; never part
    /// of any total.
    pub price_was: Option<Decimal>,
}

impl Product {
    /// The cost this product contributes to a cart at the given
    /// quantity, using the charged price.
    #[must_use]
    pub fn line_cost(&self, qty: u32) -> Option<Decimal> {
        self.price_now.map(|price| price * Decimal::from(qty))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireProduct {
    #[serde(alias = "webshopId")]
    pub id: i64,
    pub title: String,
    pub brand: Option<String>,
    #[serde(alias = "salesUnitSize")]
    pub unit_size: Option<String>,
    pub is_orderable: Option<bool>,
    pub is_available: Option<bool>,
    #[serde(default)]
    pub is_bonus: bool,
    pub bonus_mechanism: Option<String>,
    pub price: Option<WirePrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePrice {
    pub now: Option<Decimal>,
    pub was: Option<Decimal>,
    pub unit_size: Option<String>,
}

impl From<WireProduct> for Product {
    fn from(wire: WireProduct) -> Self {
        let price_unit_size = wire.price.as_ref().and_then(|p| p.unit_size.clone());
        Self {
            id: ProductId::new(wire.id),
            name: wire.title,
            brand: wire.brand,
            unit_size: wire.unit_size.or(price_unit_size),
            available: wire.is_orderable.or(wire.is_available).unwrap_or(true),
            is_bonus: wire.is_bonus,
            bonus_mechanism: wire.bonus_mechanism,
            price_now: wire.price.as_ref().and_then(|p| p.now),
            price_was: wire.price.as_ref().and_then(|p| p.was),
        }
    }
}

/// Envelope for product listings (search, bonus page).
#[derive(Debug, Deserialize)]
pub(crate) struct ProductListEnvelope {
    #[serde(default)]
    pub products: Vec<WireProduct>,
}

/// GraphQL response shape for the product detail query.
#[derive(Debug, Deserialize)]
pub(crate) struct ProductDetailData {
    pub product: Option<WireProduct>,
}

// =============================================================================
// Shopping list
// =============================================================================

/// One entry on the shopping list.
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    /// Opaque entry id, needed for removal.
    pub id: ListEntryId,
    /// Linked product id, absent for free-text entries.
    pub product_id: Option<ProductId>,
    /// Free-text description.
    pub description: Option<String>,
    /// Quantity on the list.
    pub qty: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireListEnvelope {
    #[serde(default)]
    pub items: Vec<WireListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireListEntry {
    pub id: String,
    pub product_id: Option<i64>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
}

impl From<WireListEntry> for ListEntry {
    fn from(wire: WireListEntry) -> Self {
        Self {
            id: ListEntryId::new(wire.id),
            product_id: wire.product_id.map(ProductId::new),
            description: wire.description,
            qty: wire.quantity.unwrap_or(1),
        }
    }
}

// =============================================================================
// Order cart
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireOrder {
    #[serde(default)]
    pub items: Vec<WireOrderLine>,
    #[serde(default)]
    pub total_price: serde_json::Value,
    #[serde(default)]
    pub total_discount: serde_json::Value,
    pub total_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireOrderLine {
    pub product: Option<WireProduct>,
    pub product_id: Option<i64>,
    pub quantity: Option<u32>,
}

impl WireOrder {
    /// Convert into the shared snapshot shape, keeping the raw payload
    /// for audit output.
    pub(crate) fn into_snapshot(self, raw: serde_json::Value) -> Result<CartSnapshot, AhError> {
        let total = Money::parse_value(&self.total_price)
            .map_err(|e| AhError::Backend(format!("malformed order total: {e}")))?;
        let discount = Money::parse_value(&self.total_discount)
            .map_err(|e| AhError::Backend(format!("malformed order discount: {e}")))?;

        let item_count = self.total_count.unwrap_or(self.items.len());
        let lines = self
            .items
            .into_iter()
            .filter_map(|line| {
                let product = line.product;
                let id = product
                    .as_ref()
                    .map(|p| p.id)
                    .or(line.product_id)
                    .map(EntityId::Numeric)?;
                Some(CartLine {
                    id,
                    name: product.as_ref().map(|p| p.title.clone()),
                    qty: line.quantity.unwrap_or(1),
                    price_now: product
                        .as_ref()
                        .and_then(|p| p.price.as_ref())
                        .and_then(|p| p.now)
                        .map(Money::eur),
                    is_bonus: product.as_ref().is_some_and(|p| p.is_bonus),
                })
            })
            .collect();

        Ok(CartSnapshot {
            provider: Provider::AlbertHeijn,
            lines,
            total,
            discount,
            item_count,
            raw,
        })
    }
}

// =============================================================================
// Batch writes
// =============================================================================

/// One `{id, qty}` entry of a batch write, as read from standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Product to add.
    pub id: ProductId,
    /// Quantity, defaulting to 1.
    #[serde(default = "default_qty", alias = "quantity")]
    pub qty: u32,
}

const fn default_qty() -> u32 {
    1
}

/// A failed batch item with the reason it failed.
#[derive(Debug, Serialize)]
pub struct BatchFailure {
    /// The product id that failed.
    pub id: ProductId,
    /// Requested quantity.
    pub qty: u32,
    /// Stable error code (e.g. `not_found`).
    pub code: &'static str,
    /// Human-readable reason.
    pub error: String,
}

/// Outcome of a sequential batch write.
///
/// Items are applied in order; a failure partway through does not roll
/// back already-applied items.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Items that were applied.
    pub applied: Vec<BatchEntry>,
    /// Items that failed, in input order.
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    /// Whether every item was applied.
    #[must_use]
    pub fn all_applied(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of the failed items, for error reporting.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<ProductId> {
        self.failed.iter().map(|f| f.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn bonus_product_contributes_charged_price() {
        let product = Product {
            id: ProductId::new(1),
            name: "Pindakaas".into(),
            brand: None,
            unit_size: Some("600 g".into()),
            available: true,
            is_bonus: true,
            bonus_mechanism: Some("25% korting".into()),
            price_now: Some(dec("1.50")),
            price_was: Some(dec("2.00")),
        };
        // 1.50 per unit, not 2.00 and not the 0.50 discount
        assert_eq!(product.line_cost(2), Some(dec("3.00")));
    }

    #[test]
    fn wire_product_converts_with_fallbacks() {
        let json = r#"{
            "id": 436469,
            "title": "AH Halfvolle melk",
            "isOrderable": true,
            "isBonus": false,
            "price": { "now": 1.19, "unitSize": "1 l" }
        }"#;
        let wire: WireProduct = serde_json::from_str(json).unwrap();
        let product = Product::from(wire);
        assert_eq!(product.id, ProductId::new(436_469));
        assert_eq!(product.unit_size.as_deref(), Some("1 l"));
        assert!(product.available);
        assert_eq!(product.price_now, Some(dec("1.19")));
        assert_eq!(product.price_was, None);
    }

    #[test]
    fn order_converts_to_snapshot() {
        let raw: serde_json::Value = serde_json::from_str(
            r#"{
                "items": [
                    {
                        "product": {
                            "id": 1,
                            "title": "Bananen",
                            "isBonus": true,
                            "price": { "now": 1.50, "was": 2.00 }
                        },
                        "quantity": 2
                    }
                ],
                "totalPrice": 3.00,
                "totalDiscount": 1.00,
                "totalCount": 2
            }"#,
        )
        .unwrap();
        let wire: WireOrder = serde_json::from_value(raw.clone()).unwrap();
        let snapshot = wire.into_snapshot(raw).unwrap();
        assert_eq!(snapshot.provider, Provider::AlbertHeijn);
        assert_eq!(snapshot.total.amount, dec("3.00"));
        assert_eq!(snapshot.discount.amount, dec("1.00"));
        assert_eq!(snapshot.item_count, 2);
        assert_eq!(snapshot.lines.len(), 1);
        assert!(snapshot.lines[0].is_bonus);
    }

    #[test]
    fn empty_order_has_zero_total() {
        let raw = serde_json::json!({});
        let wire: WireOrder = serde_json::from_value(raw.clone()).unwrap();
        let snapshot = wire.into_snapshot(raw).unwrap();
        assert_eq!(snapshot.total.amount, Decimal::ZERO);
        assert_eq!(snapshot.item_count, 0);
    }

    #[test]
    fn batch_entry_defaults_quantity() {
        let entry: BatchEntry = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(entry.qty, 1);
    }

    #[test]
    fn batch_report_tracks_failed_ids() {
        let report = BatchReport {
            applied: vec![BatchEntry {
                id: ProductId::new(1),
                qty: 1,
            }],
            failed: vec![BatchFailure {
                id: ProductId::new(2),
                qty: 1,
                code: "not_found",
                error: "not found: product 2".into(),
            }],
        };
        assert!(!report.all_applied());
        assert_eq!(report.failed_ids(), vec![ProductId::new(2)]);
    }
}
