//! Text and unit normalization for product matching.
//!
//! Product names are compared on stopword-filtered, accent-folded
//! tokens; package sizes are canonicalized so "1 l", "1000 ml", and
//! "6 x 330 ml" all land in one comparable (value, unit) basis.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Dutch filler words that carry no matching signal.
const STOPWORDS: &[&str] = &[
    "de", "het", "een", "en", "van", "voor", "met", "zonder", "per", "stuk", "stuks", "x",
];

static UNIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(kg|gram|grams|g|liter|litre|l|ml|cl|stuks|stuk|x)\b")
        .expect("unit pattern is valid")
});

static MULTIPACK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*x\s*(\d+(?:[.,]\d+)?)\s*(kg|g|l|ml|cl)\b")
        .expect("multipack pattern is valid")
});

/// Canonical unit basis for package-size comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalUnit {
    Grams,
    Milliliters,
    Count,
}

/// A parsed package-size hint in canonical units.
#[derive(Debug, Clone, Serialize)]
pub struct UnitHint {
    /// Amount in the canonical unit (grams, milliliters, or pieces).
    pub value: f64,
    /// The canonical unit.
    pub unit: CanonicalUnit,
    /// The matched source text.
    pub raw: String,
}

/// Fold accented Latin characters to their base letter.
fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ç' => 'c',
        'ñ' => 'n',
        _ => c,
    }
}

/// Lowercase, fold accents, strip everything but letters and digits,
/// and collapse whitespace.
#[must_use]
pub fn normalize_text(value: &str) -> String {
    let folded: String = value
        .to_lowercase()
        .chars()
        .map(fold_char)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized tokens with stopwords removed.
#[must_use]
pub fn tokenize(value: &str) -> Vec<String> {
    normalize_text(value)
        .split(' ')
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(ToString::to_string)
        .collect()
}

fn parse_amount(text: &str) -> Option<f64> {
    text.replace(',', ".").parse::<f64>().ok()
}

fn canonicalize(amount: f64, unit: &str) -> (f64, CanonicalUnit) {
    match unit {
        "kg" => (amount * 1000.0, CanonicalUnit::Grams),
        "g" | "gram" | "grams" => (amount, CanonicalUnit::Grams),
        "l" | "liter" | "litre" => (amount * 1000.0, CanonicalUnit::Milliliters),
        "cl" => (amount * 10.0, CanonicalUnit::Milliliters),
        "ml" => (amount, CanonicalUnit::Milliliters),
        // stuk / stuks / x
        _ => (amount, CanonicalUnit::Count),
    }
}

/// Parse the first recognizable package-size hint from the given texts.
///
/// Multipacks ("6 x 330 ml") resolve to their combined size. Units fold
/// to grams, milliliters, or piece counts, so "1 l" and "1000 ml"
/// compare equal.
#[must_use]
pub fn parse_unit_hint(values: &[Option<&str>]) -> Option<UnitHint> {
    for value in values.iter().flatten() {
        let text: String = value.to_lowercase().chars().map(fold_char).collect();

        if let Some(caps) = MULTIPACK_PATTERN.captures(&text) {
            let count = caps.get(1).and_then(|m| parse_amount(m.as_str()));
            let amount = caps.get(2).and_then(|m| parse_amount(m.as_str()));
            if let (Some(count), Some(amount), Some(unit)) = (count, amount, caps.get(3)) {
                let (amount, unit) = canonicalize(amount, &unit.as_str().to_lowercase());
                return Some(UnitHint {
                    value: count * amount,
                    unit,
                    raw: caps.get(0).map_or_else(String::new, |m| m.as_str().to_string()),
                });
            }
        }

        if let Some(caps) = UNIT_PATTERN.captures(&text) {
            let amount = caps.get(1).and_then(|m| parse_amount(m.as_str()));
            if let (Some(amount), Some(unit)) = (amount, caps.get(2)) {
                let (value, unit) = canonicalize(amount, &unit.as_str().to_lowercase());
                return Some(UnitHint {
                    value,
                    unit,
                    raw: caps.get(0).map_or_else(String::new, |m| m.as_str().to_string()),
                });
            }
        }
    }
    None
}

/// Character-level similarity in `[0, 1]`, as twice the longest common
/// subsequence over the combined length.
#[must_use]
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut prev = vec![0_usize; b.len() + 1];
    let mut curr = vec![0_usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            let candidate = if ca == cb {
                prev.get(j).copied().unwrap_or(0) + 1
            } else {
                prev.get(j + 1)
                    .copied()
                    .unwrap_or(0)
                    .max(curr.get(j).copied().unwrap_or(0))
            };
            if let Some(slot) = curr.get_mut(j + 1) {
                *slot = candidate;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let lcs = prev.last().copied().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)] // Product names are short
    {
        (2.0 * lcs as f64) / ((a.len() + b.len()) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_accents_and_punctuation() {
        assert_eq!(normalize_text("Crème Fraîche (200 ml)"), "creme fraiche 200 ml");
    }

    #[test]
    fn tokenize_drops_stopwords() {
        assert_eq!(
            tokenize("melk voor de koffie"),
            vec!["melk".to_string(), "koffie".to_string()]
        );
    }

    #[test]
    fn liters_and_milliliters_share_a_basis() {
        let a = parse_unit_hint(&[Some("1 l")]).unwrap();
        let b = parse_unit_hint(&[Some("1000 ml")]).unwrap();
        assert_eq!(a.unit, b.unit);
        assert!((a.value - b.value).abs() < f64::EPSILON);
    }

    #[test]
    fn kilograms_convert_to_grams() {
        let hint = parse_unit_hint(&[Some("1,5 kg")]).unwrap();
        assert_eq!(hint.unit, CanonicalUnit::Grams);
        assert!((hint.value - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn centiliters_convert_to_milliliters() {
        let hint = parse_unit_hint(&[Some("33 cl")]).unwrap();
        assert_eq!(hint.unit, CanonicalUnit::Milliliters);
        assert!((hint.value - 330.0).abs() < f64::EPSILON);
    }

    #[test]
    fn multipacks_resolve_to_combined_size() {
        let hint = parse_unit_hint(&[Some("6 x 330 ml")]).unwrap();
        assert_eq!(hint.unit, CanonicalUnit::Milliliters);
        assert!((hint.value - 1980.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pieces_parse_as_count() {
        let hint = parse_unit_hint(&[Some("4 stuks")]).unwrap();
        assert_eq!(hint.unit, CanonicalUnit::Count);
        assert!((hint.value - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn first_hint_source_wins() {
        let hint = parse_unit_hint(&[None, Some("500 g"), Some("1 kg")]).unwrap();
        assert!((hint.value - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_hint_yields_none() {
        assert!(parse_unit_hint(&[Some("verse bananen")]).is_none());
    }

    #[test]
    fn sequence_ratio_bounds() {
        assert!((sequence_ratio("melk", "melk") - 1.0).abs() < f64::EPSILON);
        assert!(sequence_ratio("melk", "kaas") < 0.6);
        assert!((sequence_ratio("", "") - 1.0).abs() < f64::EPSILON);
        assert!(sequence_ratio("melk", "").abs() < f64::EPSILON);
    }
}
