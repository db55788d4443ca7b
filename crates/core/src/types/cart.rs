//! Cart snapshots shared between providers.

use serde::{Deserialize, Serialize};

use crate::types::id::EntityId;
use crate::types::money::Money;

/// A grocery provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    AlbertHeijn,
    Picnic,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlbertHeijn => f.write_str("albert_heijn"),
            Self::Picnic => f.write_str("picnic"),
        }
    }
}

/// One line in a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Provider-side product id.
    pub id: EntityId,
    /// Product name as the provider reports it.
    pub name: Option<String>,
    /// Requested quantity.
    pub qty: u32,
    /// Currently charged unit price. For bonus products this is already
    /// the promotional price.
    pub price_now: Option<Money>,
    /// Whether the line is under a promotional (bonus) mechanism.
    #[serde(default)]
    pub is_bonus: bool,
}

/// A read-only aggregation of one provider's current cart.
///
/// Fetched fresh per comparison; never persisted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Which provider the snapshot came from.
    pub provider: Provider,
    /// Cart lines, as far as the provider exposes them.
    pub lines: Vec<CartLine>,
    /// Cart total in euros (bonus pricing already applied).
    pub total: Money,
    /// Total promotional discount included in `total`.
    pub discount: Money,
    /// Number of items in the cart.
    pub item_count: usize,
    /// The provider's raw cart payload, for audit output.
    #[serde(skip_serializing_if = "serde_json::Value::is_null", default)]
    pub raw: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Provider::AlbertHeijn).unwrap(),
            "\"albert_heijn\""
        );
        assert_eq!(serde_json::to_string(&Provider::Picnic).unwrap(), "\"picnic\"");
    }
}
