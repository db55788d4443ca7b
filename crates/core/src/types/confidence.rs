//! Match confidence bands.

use serde::{Deserialize, Serialize};

/// How certain the matcher is that two providers' candidates represent
/// the same real-world product.
///
/// The derived ordering runs from least to most certain, so combining
/// per-provider bands is a plain `min`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// A provider returned no candidates at all.
    #[default]
    Unresolved,
    /// No candidate cleared the score threshold.
    Low,
    /// The top candidate cleared the threshold but the runner-up is too
    /// close to call.
    Medium,
    /// The top candidate cleared the threshold with a clear gap, or the
    /// caller supplied an explicit product id.
    High,
}

impl Confidence {
    /// The overall confidence for an item matched against two providers:
    /// never higher than the weakest provider.
    #[must_use]
    pub fn combined(self, other: Self) -> Self {
        self.min(other)
    }

    /// Whether this band permits unattended cart writes.
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unresolved => "unresolved",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_is_never_above_either_side() {
        let bands = [
            Confidence::Unresolved,
            Confidence::Low,
            Confidence::Medium,
            Confidence::High,
        ];
        for a in bands {
            for b in bands {
                let c = a.combined(b);
                assert!(c <= a);
                assert!(c <= b);
            }
        }
    }

    #[test]
    fn combined_takes_the_minimum() {
        assert_eq!(
            Confidence::High.combined(Confidence::Medium),
            Confidence::Medium
        );
        assert_eq!(
            Confidence::Low.combined(Confidence::Unresolved),
            Confidence::Unresolved
        );
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Confidence::High).unwrap(),
            "\"high\""
        );
        assert_eq!(
            serde_json::to_string(&Confidence::Unresolved).unwrap(),
            "\"unresolved\""
        );
    }
}
