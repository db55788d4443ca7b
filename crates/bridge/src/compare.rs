//! Checkout comparison across both providers.
//!
//! Both cart snapshots are fetched fresh (never cached), normalized to
//! euros, and compared. Albert Heijn totals arrive in euros; numeric
//! Picnic totals may be expressed in minor units and are converted per
//! the configured unit flag. Bonus pricing needs no special handling
//! here: `price_now` is already the charged price, so provider totals
//! include it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use boodschap_core::{CartLine, CartSnapshot, EntityId, Money, Provider};

use crate::error::BridgeError;

/// How numeric Picnic totals are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PicnicUnit {
    /// Integer minor units (cents). The collaborator's native format.
    #[default]
    Cents,
    /// Already in euros.
    Eur,
}

impl std::str::FromStr for PicnicUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cents" => Ok(Self::Cents),
            "eur" => Ok(Self::Eur),
            other => Err(format!("invalid picnic unit: {other} (expected cents|eur)")),
        }
    }
}

impl std::fmt::Display for PicnicUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cents => f.write_str("cents"),
            Self::Eur => f.write_str("eur"),
        }
    }
}

/// Which store the comparison recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    AlbertHeijn,
    Picnic,
    /// Totals are exactly equal; no recommendation.
    Either,
}

/// Comparison options resolved from config and flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareOptions {
    /// Unit for numeric Picnic totals.
    pub picnic_unit: PicnicUnit,
    /// Force an Albert Heijn recommendation.
    pub always_ah: bool,
    /// Force a Picnic recommendation.
    pub always_picnic: bool,
}

/// Per-store totals in the comparison report.
#[derive(Debug, Clone, Serialize)]
pub struct AhTotals {
    pub total: Decimal,
    pub discount: Decimal,
    pub item_count: usize,
}

/// Per-store totals in the comparison report.
#[derive(Debug, Clone, Serialize)]
pub struct PicnicTotals {
    pub total: Decimal,
    pub item_count: usize,
    pub total_unit_assumption: PicnicUnit,
}

/// The checkout comparison report.
#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub ah: AhTotals,
    pub picnic: PicnicTotals,
    pub recommendation: Recommendation,
    pub savings: Decimal,
    /// Set when a store-preference override forced the recommendation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference_override: Option<Provider>,
}

impl CompareReport {
    /// The user-facing checkout instruction.
    #[must_use]
    pub const fn checkout_message(&self) -> &'static str {
        match self.recommendation {
            Recommendation::AlbertHeijn => "Checkout in Albert Heijn app",
            Recommendation::Picnic => "Checkout in Picnic app",
            Recommendation::Either => "Either app has the same total",
        }
    }
}

/// Convert a raw Picnic cart payload into the shared snapshot shape.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidOutput`]-style config errors when the
/// totals cannot be interpreted.
pub fn picnic_snapshot(
    raw: serde_json::Value,
    unit: PicnicUnit,
) -> Result<CartSnapshot, BridgeError> {
    let total = parse_picnic_money(raw.get("totalPrice"), unit)?;

    let items = raw
        .get("items")
        .and_then(serde_json::Value::as_array)
        .cloned()
        .unwrap_or_default();

    let item_count = raw
        .get("itemCount")
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(items.len());

    let lines = items
        .iter()
        .filter_map(|item| {
            let id = match item.get("id") {
                Some(serde_json::Value::String(s)) => EntityId::Opaque(s.clone()),
                Some(serde_json::Value::Number(n)) => EntityId::Numeric(n.as_i64()?),
                _ => return None,
            };
            let price_now = item
                .get("price")
                .map(|p| parse_picnic_money(Some(p), unit))
                .transpose()
                .ok()
                .flatten();
            Some(CartLine {
                id,
                name: item
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .map(ToString::to_string),
                qty: item
                    .get("quantity")
                    .or_else(|| item.get("count"))
                    .and_then(serde_json::Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(1),
                price_now,
                is_bonus: false,
            })
        })
        .collect();

    Ok(CartSnapshot {
        provider: Provider::Picnic,
        lines,
        total,
        discount: Money::zero(),
        item_count,
        raw,
    })
}

/// Interpret a Picnic money value: numbers scale per the unit flag,
/// strings carry their own formatting and are parsed as-is.
fn parse_picnic_money(
    value: Option<&serde_json::Value>,
    unit: PicnicUnit,
) -> Result<Money, BridgeError> {
    let Some(value) = value else {
        return Ok(Money::zero());
    };
    let money = Money::parse_value(value)
        .map_err(|e| BridgeError::Config(format!("unparseable picnic total: {e}")))?;

    match (unit, value) {
        (PicnicUnit::Cents, serde_json::Value::Number(_)) => {
            Ok(Money::eur(money.amount / Decimal::from(100)))
        }
        _ => Ok(money),
    }
}

/// Build the comparison report from two fresh snapshots.
#[must_use]
pub fn build_report(
    ah: &CartSnapshot,
    picnic: &CartSnapshot,
    options: CompareOptions,
) -> CompareReport {
    let ah_total = ah.total.rounded();
    let picnic_total = picnic.total.rounded();

    // Strictly lower total wins; a tie is explicitly no recommendation
    let (mut recommendation, savings) = if ah_total < picnic_total {
        (Recommendation::AlbertHeijn, picnic_total - ah_total)
    } else if picnic_total < ah_total {
        (Recommendation::Picnic, ah_total - picnic_total)
    } else {
        (Recommendation::Either, Decimal::ZERO)
    };

    let mut preference_override = None;
    if options.always_ah {
        preference_override = Some(Provider::AlbertHeijn);
        recommendation = Recommendation::AlbertHeijn;
    } else if options.always_picnic {
        preference_override = Some(Provider::Picnic);
        recommendation = Recommendation::Picnic;
    }

    CompareReport {
        ah: AhTotals {
            total: ah_total,
            discount: ah.discount.rounded(),
            item_count: ah.item_count,
        },
        picnic: PicnicTotals {
            total: picnic_total,
            item_count: picnic.item_count,
            total_unit_assumption: options.picnic_unit,
        },
        recommendation,
        savings: savings.round_dp(2),
        preference_override,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ah_snapshot(total: &str, discount: &str, count: usize) -> CartSnapshot {
        CartSnapshot {
            provider: Provider::AlbertHeijn,
            lines: Vec::new(),
            total: Money::eur(dec(total)),
            discount: Money::eur(dec(discount)),
            item_count: count,
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn numeric_cents_totals_are_scaled() {
        let snapshot =
            picnic_snapshot(serde_json::json!({ "totalPrice": 1200 }), PicnicUnit::Cents)
                .unwrap();
        assert_eq!(snapshot.total.amount, dec("12.00"));
    }

    #[test]
    fn numeric_eur_totals_are_taken_as_is() {
        let snapshot =
            picnic_snapshot(serde_json::json!({ "totalPrice": 12.5 }), PicnicUnit::Eur).unwrap();
        assert_eq!(snapshot.total.amount, dec("12.5"));
    }

    #[test]
    fn string_totals_ignore_the_unit_flag() {
        let snapshot = picnic_snapshot(
            serde_json::json!({ "totalPrice": "EUR 12,00" }),
            PicnicUnit::Cents,
        )
        .unwrap();
        assert_eq!(snapshot.total.amount, dec("12.00"));
    }

    #[test]
    fn cheaper_ah_cart_is_recommended() {
        // AH 10.00 EUR vs Picnic 1200 cents: normalize to 12.00, pick AH
        let ah = ah_snapshot("10.00", "0", 3);
        let picnic =
            picnic_snapshot(serde_json::json!({ "totalPrice": 1200 }), PicnicUnit::Cents)
                .unwrap();
        let report = build_report(&ah, &picnic, CompareOptions::default());
        assert_eq!(report.picnic.total, dec("12.00"));
        assert_eq!(report.recommendation, Recommendation::AlbertHeijn);
        assert_eq!(report.savings, dec("2.00"));
    }

    #[test]
    fn equal_totals_recommend_neither() {
        let ah = ah_snapshot("12.00", "0", 2);
        let picnic =
            picnic_snapshot(serde_json::json!({ "totalPrice": 1200 }), PicnicUnit::Cents)
                .unwrap();
        let report = build_report(&ah, &picnic, CompareOptions::default());
        assert_eq!(report.recommendation, Recommendation::Either);
        assert_eq!(report.savings, Decimal::ZERO);
        assert_eq!(report.checkout_message(), "Either app has the same total");
    }

    #[test]
    fn preference_override_forces_the_recommendation() {
        let ah = ah_snapshot("15.00", "0", 2);
        let picnic =
            picnic_snapshot(serde_json::json!({ "totalPrice": 1200 }), PicnicUnit::Cents)
                .unwrap();
        let options = CompareOptions {
            always_ah: true,
            ..CompareOptions::default()
        };
        let report = build_report(&ah, &picnic, options);
        assert_eq!(report.recommendation, Recommendation::AlbertHeijn);
        assert_eq!(report.preference_override, Some(Provider::AlbertHeijn));
        // Savings still reflect the actual totals
        assert_eq!(report.savings, dec("3.00"));
    }

    #[test]
    fn item_lines_are_parsed_best_effort() {
        let snapshot = picnic_snapshot(
            serde_json::json!({
                "totalPrice": 318,
                "itemCount": 2,
                "items": [
                    { "id": "s100", "name": "Melk", "quantity": 2, "price": 109 },
                    { "id": "s200", "name": "Brood", "price": 100 }
                ]
            }),
            PicnicUnit::Cents,
        )
        .unwrap();
        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.lines[0].qty, 2);
        assert_eq!(snapshot.lines[0].price_now.unwrap().amount, dec("1.09"));
        assert_eq!(snapshot.item_count, 2);
    }

    #[test]
    fn missing_total_is_zero() {
        let snapshot = picnic_snapshot(serde_json::json!({}), PicnicUnit::Cents).unwrap();
        assert_eq!(snapshot.total.amount, Decimal::ZERO);
    }

    #[test]
    fn unit_flag_parses_from_str() {
        assert_eq!("cents".parse::<PicnicUnit>().unwrap(), PicnicUnit::Cents);
        assert_eq!("eur".parse::<PicnicUnit>().unwrap(), PicnicUnit::Eur);
        assert!("bogus".parse::<PicnicUnit>().is_err());
    }
}
