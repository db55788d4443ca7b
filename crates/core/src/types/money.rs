//! Money parsing and representation using decimal arithmetic.
//!
//! Grocery backends are sloppy about money: Albert Heijn reports euro
//! amounts as JSON numbers or locale-formatted strings ("1.234,56"),
//! Picnic reports integer minor units. Everything is normalized into a
//! [`Money`] value backed by `rust_decimal` so totals never go through
//! floating point.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while parsing money values.
#[derive(Debug, Error)]
pub enum MoneyError {
    /// The value could not be interpreted as an amount.
    #[error("unparseable money value: {0}")]
    Unparseable(String),
}

/// A monetary amount with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's major unit (euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

/// ISO 4217 currency codes.
///
/// Both supported grocery providers trade in euros only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
}

impl CurrencyCode {
    /// The ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EUR => "EUR",
        }
    }
}

impl Money {
    /// Create a euro amount.
    #[must_use]
    pub const fn eur(amount: Decimal) -> Self {
        Self {
            amount,
            currency_code: CurrencyCode::EUR,
        }
    }

    /// Zero euros.
    #[must_use]
    pub fn zero() -> Self {
        Self::eur(Decimal::ZERO)
    }

    /// Convert minor units (cents) to a major-unit amount.
    #[must_use]
    pub fn from_minor_units(cents: i64) -> Self {
        Self::eur(Decimal::new(cents, 2))
    }

    /// Parse a locale-tolerant money string.
    ///
    /// Accepts currency markers ("EUR", "€"), thousands separators, and
    /// both comma and dot decimal separators: `"€ 1.234,56"` parses to
    /// `1234.56`. An empty string (after stripping) is zero.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Unparseable`] when no numeric value remains.
    pub fn parse_str(value: &str) -> Result<Self, MoneyError> {
        let mut s: String = value
            .replace("EUR", "")
            .replace('\u{20ac}', "")
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
            .collect();

        if s.is_empty() {
            return Ok(Self::zero());
        }

        let last_comma = s.rfind(',');
        let last_dot = s.rfind('.');
        match (last_comma, last_dot) {
            (Some(comma), Some(dot)) => {
                if comma > dot {
                    // "1.234,56": dots are thousands separators
                    s = s.replace('.', "").replace(',', ".");
                } else {
                    // "1,234.56": commas are thousands separators
                    s = s.replace(',', "");
                }
            }
            (Some(_), None) => {
                s = s.replace(',', ".");
            }
            _ => {}
        }

        s.parse::<Decimal>()
            .map(Self::eur)
            .map_err(|_| MoneyError::Unparseable(value.to_string()))
    }

    /// Parse a JSON value that may be a number, a string, or absent.
    ///
    /// `null` is treated as zero, matching how cart payloads omit totals
    /// for empty carts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Unparseable`] for non-scalar values or
    /// unparseable strings.
    pub fn parse_value(value: &serde_json::Value) -> Result<Self, MoneyError> {
        match value {
            serde_json::Value::Null => Ok(Self::zero()),
            serde_json::Value::Number(n) => n
                .to_string()
                .parse::<Decimal>()
                .map(Self::eur)
                .map_err(|_| MoneyError::Unparseable(n.to_string())),
            serde_json::Value::String(s) => Self::parse_str(s),
            other => Err(MoneyError::Unparseable(other.to_string())),
        }
    }

    /// The amount rounded to two decimal places.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.amount.round_dp(2)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.2}", self.currency_code.code(), self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_plain_amount() {
        assert_eq!(Money::parse_str("12.50").unwrap().amount, dec("12.50"));
    }

    #[test]
    fn parses_euro_markers() {
        assert_eq!(Money::parse_str("EUR 12.50").unwrap().amount, dec("12.50"));
        assert_eq!(Money::parse_str("€ 3,99").unwrap().amount, dec("3.99"));
    }

    #[test]
    fn parses_dutch_thousands_format() {
        assert_eq!(
            Money::parse_str("1.234,56").unwrap().amount,
            dec("1234.56")
        );
    }

    #[test]
    fn parses_english_thousands_format() {
        assert_eq!(
            Money::parse_str("1,234.56").unwrap().amount,
            dec("1234.56")
        );
    }

    #[test]
    fn comma_only_is_decimal_separator() {
        assert_eq!(Money::parse_str("4,25").unwrap().amount, dec("4.25"));
    }

    #[test]
    fn empty_after_stripping_is_zero() {
        assert_eq!(Money::parse_str("EUR").unwrap().amount, Decimal::ZERO);
    }

    #[test]
    fn parses_json_number_and_null() {
        let v: serde_json::Value = serde_json::json!(10.0);
        assert_eq!(Money::parse_value(&v).unwrap().amount, dec("10"));
        assert_eq!(
            Money::parse_value(&serde_json::Value::Null).unwrap().amount,
            Decimal::ZERO
        );
    }

    #[test]
    fn rejects_array_value() {
        let v = serde_json::json!([1, 2]);
        assert!(Money::parse_value(&v).is_err());
    }

    #[test]
    fn minor_units_convert_to_euros() {
        assert_eq!(Money::from_minor_units(1200).amount, dec("12.00"));
        assert_eq!(Money::from_minor_units(5).amount, dec("0.05"));
    }

    #[test]
    fn display_includes_currency() {
        assert_eq!(Money::from_minor_units(1250).to_string(), "EUR 12.50");
    }
}
