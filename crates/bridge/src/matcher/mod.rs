//! Cross-store product matcher.
//!
//! For each grocery item without explicit ids, both providers are
//! searched (bounded candidate sets) and candidates are scored on name
//! similarity, package-size compatibility, brand hints, availability,
//! and a small bonus tie-break. Scores land in `[0, 100]`.
//!
//! The confidence bands are the contract; the exact weights are not:
//! - **high**: top score clears the threshold AND leads the runner-up
//!   by at least the configured gap
//! - **medium**: clears the threshold but the gap condition fails
//! - **low**: no candidate clears the threshold
//! - **unresolved**: the provider returned zero candidates
//!
//! An item's overall confidence is the minimum of the two providers'.
//! Explicit ids bypass search and are high by definition.

mod cache;
mod normalize;

pub use cache::{CacheEntry, MatchCache, cache_key};
pub use normalize::{CanonicalUnit, UnitHint, normalize_text, parse_unit_hint, sequence_ratio, tokenize};

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use boodschap_ah::{AhClient, BatchEntry, Product};
use boodschap_core::{Confidence, EntityId, GroceryItem, PicnicProductId, ProductId};

use crate::config::MatchSettings;
use crate::error::BridgeError;
use crate::picnic::{PicnicCli, PicnicProduct};

// Scoring weights. Name similarity dominates; the rest nudge.
const TOKEN_OVERLAP_WEIGHT: f64 = 60.0;
const SEQUENCE_WEIGHT: f64 = 35.0;
const EXACT_NAME_SCORE: f64 = 100.0;

const MISSING_CANDIDATE_UNIT_PENALTY: f64 = -6.0;
const UNIT_MISMATCH_PENALTY: f64 = -20.0;
const UNIT_CLOSE_BONUS: f64 = 15.0;
const UNIT_REASONABLE_BONUS: f64 = 8.0;
const UNIT_FAR_BONUS: f64 = 2.0;
const UNIT_VERY_FAR_PENALTY: f64 = -10.0;

const BRAND_MATCH_BONUS: f64 = 10.0;
const BRAND_MISMATCH_PENALTY: f64 = -6.0;
const UNAVAILABLE_PENALTY: f64 = -25.0;
const BONUS_TIEBREAK: f64 = 2.0;

const EXPLICIT_ID_SCORE: f64 = 100.0;
const CACHE_HIT_SCORE: f64 = 95.0;

// =============================================================================
// Candidates and scoring
// =============================================================================

/// A provider-agnostic match candidate.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Provider-side product id.
    pub id: EntityId,
    /// Product name.
    pub name: String,
    /// Brand, when reported.
    pub brand: Option<String>,
    /// Package size as free text.
    pub unit_size: Option<String>,
    /// Availability, when reported.
    pub available: Option<bool>,
    /// Whether a promotional price applies.
    pub is_bonus: bool,
}

impl From<&Product> for Candidate {
    fn from(product: &Product) -> Self {
        Self {
            id: EntityId::Numeric(product.id.as_i64()),
            name: product.name.clone(),
            brand: product.brand.clone(),
            unit_size: product.unit_size.clone(),
            available: Some(product.available),
            is_bonus: product.is_bonus,
        }
    }
}

impl From<&PicnicProduct> for Candidate {
    fn from(product: &PicnicProduct) -> Self {
        Self {
            id: EntityId::Opaque(product.id.to_string()),
            name: product.name.clone(),
            brand: None,
            unit_size: product.unit_size.clone(),
            available: product.available,
            is_bonus: false,
        }
    }
}

/// Per-component score contributions, kept for explainability.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub name: f64,
    pub unit: f64,
    pub brand: f64,
    pub availability: f64,
    pub bonus_tiebreak: f64,
    pub token_overlap: f64,
    pub sequence_ratio: f64,
    pub name_exact: bool,
    pub unit_reason: &'static str,
    pub brand_reason: &'static str,
    pub availability_reason: &'static str,
    pub bonus_reason: &'static str,
}

/// A candidate with its total score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
}

struct NameScore {
    score: f64,
    token_overlap: f64,
    sequence_ratio: f64,
    exact: bool,
}

fn score_name(query: &str, candidate_name: &str) -> NameScore {
    let query_norm = normalize_text(query);
    let candidate_norm = normalize_text(candidate_name);
    if query_norm.is_empty() || candidate_norm.is_empty() {
        return NameScore {
            score: 0.0,
            token_overlap: 0.0,
            sequence_ratio: 0.0,
            exact: false,
        };
    }

    let exact = query_norm == candidate_norm;
    let query_tokens: BTreeSet<String> = tokenize(query).into_iter().collect();
    let candidate_tokens: BTreeSet<String> = tokenize(candidate_name).into_iter().collect();

    let token_overlap = if query_tokens.is_empty() || candidate_tokens.is_empty() {
        0.0
    } else {
        let intersection = query_tokens.intersection(&candidate_tokens).count();
        let union = query_tokens.union(&candidate_tokens).count();
        #[allow(clippy::cast_precision_loss)] // Token counts are tiny
        {
            intersection as f64 / union as f64
        }
    };

    let ratio = sequence_ratio(&query_norm, &candidate_norm);
    let score = if exact {
        EXACT_NAME_SCORE
    } else {
        token_overlap * TOKEN_OVERLAP_WEIGHT + ratio * SEQUENCE_WEIGHT
    };

    NameScore {
        score,
        token_overlap,
        sequence_ratio: ratio,
        exact,
    }
}

fn score_unit(item: &GroceryItem, candidate: &Candidate) -> (f64, &'static str) {
    let query_hint = parse_unit_hint(&[item.unit_hint.as_deref(), item.name.as_deref()]);
    let candidate_hint =
        parse_unit_hint(&[candidate.unit_size.as_deref(), Some(candidate.name.as_str())]);

    let Some(query_hint) = query_hint else {
        return (0.0, "no_query_unit_hint");
    };
    let Some(candidate_hint) = candidate_hint else {
        return (MISSING_CANDIDATE_UNIT_PENALTY, "missing_candidate_unit");
    };
    if query_hint.unit != candidate_hint.unit {
        return (UNIT_MISMATCH_PENALTY, "unit_mismatch");
    }
    if query_hint.value <= 0.0 {
        return (0.0, "invalid_query_unit");
    }

    let delta = (candidate_hint.value - query_hint.value).abs() / query_hint.value;
    if delta <= 0.10 {
        (UNIT_CLOSE_BONUS, "unit_close")
    } else if delta <= 0.25 {
        (UNIT_REASONABLE_BONUS, "unit_reasonable")
    } else if delta <= 0.50 {
        (UNIT_FAR_BONUS, "unit_far")
    } else {
        (UNIT_VERY_FAR_PENALTY, "unit_very_far")
    }
}

fn score_brand(item: &GroceryItem, candidate: &Candidate) -> (f64, &'static str) {
    let Some(brand) = item.brand.as_deref().filter(|b| !b.is_empty()) else {
        return (0.0, "no_brand_hint");
    };
    let brand_norm = normalize_text(brand);
    let candidate_name = normalize_text(&candidate.name);
    let candidate_brand = normalize_text(candidate.brand.as_deref().unwrap_or(""));

    if !brand_norm.is_empty()
        && (candidate_name.contains(&brand_norm) || candidate_brand.contains(&brand_norm))
    {
        (BRAND_MATCH_BONUS, "brand_match")
    } else {
        (BRAND_MISMATCH_PENALTY, "brand_mismatch")
    }
}

fn score_availability(candidate: &Candidate) -> (f64, &'static str) {
    if candidate.available == Some(false) {
        (UNAVAILABLE_PENALTY, "not_available")
    } else {
        (0.0, "available_or_unknown")
    }
}

fn score_bonus(candidate: &Candidate, settings: &MatchSettings) -> (f64, &'static str) {
    if !settings.prefer_bonus_tiebreak {
        return (0.0, "bonus_tiebreak_disabled");
    }
    if candidate.is_bonus {
        (BONUS_TIEBREAK, "bonus_tiebreak")
    } else {
        (0.0, "no_bonus")
    }
}

/// Score one candidate against the requested item.
#[must_use]
pub fn score_candidate(
    item: &GroceryItem,
    candidate: Candidate,
    settings: &MatchSettings,
) -> ScoredCandidate {
    let name = score_name(item.name.as_deref().unwrap_or(""), &candidate.name);
    let (unit, unit_reason) = score_unit(item, &candidate);
    let (brand, brand_reason) = score_brand(item, &candidate);
    let (availability, availability_reason) = score_availability(&candidate);
    let (bonus, bonus_reason) = score_bonus(&candidate, settings);

    let total = (name.score + unit + brand + availability + bonus).clamp(0.0, 100.0);

    ScoredCandidate {
        candidate,
        score: total,
        score_breakdown: ScoreBreakdown {
            name: name.score,
            unit,
            brand,
            availability,
            bonus_tiebreak: bonus,
            token_overlap: name.token_overlap,
            sequence_ratio: name.sequence_ratio,
            name_exact: name.exact,
            unit_reason,
            brand_reason,
            availability_reason,
            bonus_reason,
        },
    }
}

// =============================================================================
// Per-provider decisions
// =============================================================================

/// One provider's matching decision for an item.
#[derive(Debug, Clone, Serialize)]
pub struct StoreMatch {
    /// Whether this provider reached high confidence.
    pub resolved: bool,
    /// Confidence band.
    pub confidence: Confidence,
    /// Top candidate's score.
    pub score: f64,
    /// Lead of the top candidate over the runner-up.
    pub score_gap: f64,
    /// Why the band was assigned.
    pub reason: &'static str,
    /// The winning candidate, if any.
    pub selected: Option<ScoredCandidate>,
    /// Runner-up candidates for manual disambiguation.
    pub alternatives: Vec<ScoredCandidate>,
    /// Whether this decision came from the match cache.
    pub from_cache: bool,
}

impl StoreMatch {
    fn explicit(id: EntityId) -> Self {
        Self {
            resolved: true,
            confidence: Confidence::High,
            score: EXPLICIT_ID_SCORE,
            score_gap: EXPLICIT_ID_SCORE,
            reason: "explicit_id",
            selected: Some(bare_candidate(id, None, EXPLICIT_ID_SCORE)),
            alternatives: Vec::new(),
            from_cache: false,
        }
    }

    fn cached(id: EntityId, name: Option<String>) -> Self {
        Self {
            resolved: true,
            confidence: Confidence::High,
            score: CACHE_HIT_SCORE,
            score_gap: CACHE_HIT_SCORE,
            reason: "cache_hit",
            selected: Some(bare_candidate(id, name, CACHE_HIT_SCORE)),
            alternatives: Vec::new(),
            from_cache: true,
        }
    }

    fn no_query() -> Self {
        Self {
            resolved: false,
            confidence: Confidence::Unresolved,
            score: 0.0,
            score_gap: 0.0,
            reason: "missing_query",
            selected: None,
            alternatives: Vec::new(),
            from_cache: false,
        }
    }
}

fn bare_candidate(id: EntityId, name: Option<String>, score: f64) -> ScoredCandidate {
    ScoredCandidate {
        candidate: Candidate {
            id,
            name: name.unwrap_or_default(),
            brand: None,
            unit_size: None,
            available: None,
            is_bonus: false,
        },
        score,
        score_breakdown: ScoreBreakdown {
            name: score,
            unit: 0.0,
            brand: 0.0,
            availability: 0.0,
            bonus_tiebreak: 0.0,
            token_overlap: 0.0,
            sequence_ratio: 0.0,
            name_exact: false,
            unit_reason: "not_scored",
            brand_reason: "not_scored",
            availability_reason: "not_scored",
            bonus_reason: "not_scored",
        },
    }
}

/// Assign a confidence band to a scored candidate set.
#[must_use]
pub fn choose_best(mut scored: Vec<ScoredCandidate>, settings: &MatchSettings) -> StoreMatch {
    if scored.is_empty() {
        return StoreMatch {
            resolved: false,
            confidence: Confidence::Unresolved,
            score: 0.0,
            score_gap: 0.0,
            reason: "no_candidates",
            selected: None,
            alternatives: Vec::new(),
            from_cache: false,
        };
    }

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut rest = scored;
    let top = rest.remove(0);
    let second_score = rest.first().map_or(0.0, |c| c.score);
    let score_gap = top.score - second_score;

    let (confidence, reason) = if top.score >= settings.threshold && score_gap >= settings.gap {
        (Confidence::High, "high_confidence")
    } else if top.score >= settings.threshold {
        (Confidence::Medium, "score_gap_too_small")
    } else {
        (Confidence::Low, "below_threshold")
    };

    rest.truncate(settings.max_alternatives);
    StoreMatch {
        resolved: confidence.is_high(),
        confidence,
        score: top.score,
        score_gap,
        reason,
        selected: Some(top),
        alternatives: rest,
        from_cache: false,
    }
}

// =============================================================================
// Item-level matching
// =============================================================================

/// One item's decisions across both providers.
#[derive(Debug, Serialize)]
pub struct ItemMatch {
    /// The requested item.
    pub input: GroceryItem,
    /// The match-cache key for this item.
    pub cache_key: String,
    /// Whether the item is safe to add unattended.
    pub resolved: bool,
    /// Overall confidence: the minimum of both providers'.
    pub confidence: Confidence,
    /// Albert Heijn decision.
    pub ah: StoreMatch,
    /// Picnic decision.
    pub picnic: StoreMatch,
}

/// An item resolved to concrete ids on both providers.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedItem {
    pub name: Option<String>,
    pub qty: u32,
    pub ah_id: ProductId,
    pub picnic_id: PicnicProductId,
}

/// An item the matcher could not resolve with high confidence.
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedItem {
    pub name: Option<String>,
    pub qty: u32,
    pub ah_confidence: Confidence,
    pub picnic_confidence: Confidence,
    pub ah_reason: &'static str,
    pub picnic_reason: &'static str,
}

/// Counters over a matching run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchSummary {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub cache_hits: usize,
}

/// The full matching report.
#[derive(Debug, Serialize)]
pub struct MatchReport {
    pub settings: MatchSettings,
    pub summary: MatchSummary,
    pub items: Vec<ItemMatch>,
    pub resolved_items: Vec<ResolvedItem>,
    pub unresolved_items: Vec<UnresolvedItem>,
}

impl MatchReport {
    /// The strict-add gate: every item must be resolved, otherwise no
    /// writes may happen anywhere.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnresolvedMatch`] when any item fell short
    /// of high confidence.
    pub fn require_all_resolved(&self) -> Result<(), BridgeError> {
        if self.summary.unresolved > 0 {
            return Err(BridgeError::UnresolvedMatch {
                total: self.summary.total,
                unresolved: self.summary.unresolved,
            });
        }
        Ok(())
    }

    /// Aggregate the resolved items into per-provider write batches.
    #[must_use]
    pub fn resolved_batches(&self) -> (Vec<BatchEntry>, Vec<PicnicBatchEntry>) {
        let ah: Vec<(ProductId, u32)> = self
            .resolved_items
            .iter()
            .map(|item| (item.ah_id, item.qty))
            .collect();
        let picnic: Vec<(PicnicProductId, u32, Option<String>)> = self
            .resolved_items
            .iter()
            .map(|item| (item.picnic_id.clone(), item.qty, item.name.clone()))
            .collect();
        (aggregate_ah_batch(&ah), aggregate_picnic_batch(&picnic))
    }
}

// =============================================================================
// Batch planning
// =============================================================================

/// A planned Picnic cart write.
#[derive(Debug, Clone, Serialize)]
pub struct PicnicBatchEntry {
    pub id: PicnicProductId,
    pub qty: u32,
    pub name: Option<String>,
}

/// Merge duplicate AH ids, summing quantities, sorted by id.
#[must_use]
pub fn aggregate_ah_batch(items: &[(ProductId, u32)]) -> Vec<BatchEntry> {
    let mut counts: BTreeMap<ProductId, u32> = BTreeMap::new();
    for (id, qty) in items {
        *counts.entry(*id).or_insert(0) += (*qty).max(1);
    }
    counts
        .into_iter()
        .map(|(id, qty)| BatchEntry { id, qty })
        .collect()
}

/// Merge duplicate Picnic ids, summing quantities, sorted by id.
#[must_use]
pub fn aggregate_picnic_batch(
    items: &[(PicnicProductId, u32, Option<String>)],
) -> Vec<PicnicBatchEntry> {
    let mut counts: BTreeMap<PicnicProductId, (u32, Option<String>)> = BTreeMap::new();
    for (id, qty, name) in items {
        let slot = counts.entry(id.clone()).or_insert((0, None));
        slot.0 += (*qty).max(1);
        if slot.1.is_none() {
            slot.1.clone_from(name);
        }
    }
    counts
        .into_iter()
        .map(|(id, (qty, name))| PicnicBatchEntry { id, qty, name })
        .collect()
}

// =============================================================================
// Matcher
// =============================================================================

/// Runs item matching against both providers.
pub struct Matcher<'a> {
    ah: &'a AhClient,
    picnic: &'a PicnicCli,
    settings: MatchSettings,
}

impl<'a> Matcher<'a> {
    /// Create a matcher with the given settings.
    #[must_use]
    pub const fn new(ah: &'a AhClient, picnic: &'a PicnicCli, settings: MatchSettings) -> Self {
        Self {
            ah,
            picnic,
            settings,
        }
    }

    /// Match every item against both providers.
    ///
    /// With `use_cache`, still-valid cache entries short-circuit the
    /// searches, and freshly resolved items are written back.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; scoring itself cannot fail.
    #[instrument(skip_all, fields(items = items.len(), use_cache))]
    pub async fn match_items(
        &self,
        items: &[GroceryItem],
        use_cache: bool,
    ) -> Result<MatchReport, BridgeError> {
        let now = Utc::now();
        let mut cache = if use_cache {
            MatchCache::load(&self.settings.cache_file)
        } else {
            MatchCache::default()
        };

        let mut matched = Vec::with_capacity(items.len());
        let mut resolved_items = Vec::new();
        let mut unresolved_items = Vec::new();
        let mut cache_hits = 0_usize;
        let mut cache_dirty = false;

        for item in items {
            let key = cache_key(item);
            let cached = if use_cache {
                cache
                    .valid_entry(&key, now, self.settings.cache_ttl_seconds)
                    .cloned()
            } else {
                None
            };

            let ah = self.resolve_ah(item, cached.as_ref()).await?;
            let picnic = self.resolve_picnic(item, cached.as_ref()).await?;

            if ah.from_cache {
                cache_hits += 1;
            }
            if picnic.from_cache {
                cache_hits += 1;
            }

            let confidence = ah.confidence.combined(picnic.confidence);
            let resolved = confidence.is_high();

            if resolved {
                match (ah_selected_id(&ah), picnic_selected_id(&picnic)) {
                    (Some(ah_id), Some(picnic_id)) => {
                        resolved_items.push(ResolvedItem {
                            name: item.name.clone(),
                            qty: item.qty,
                            ah_id,
                            picnic_id: picnic_id.clone(),
                        });
                        // Refresh the cache only for decisions that did
                        // real work; cache hits keep their timestamp so
                        // the TTL cannot extend itself forever.
                        if use_cache && !key.is_empty() && !(ah.from_cache && picnic.from_cache) {
                            cache.insert(
                                key.clone(),
                                CacheEntry {
                                    ah_id,
                                    ah_name: selected_name(&ah),
                                    picnic_id,
                                    picnic_name: selected_name(&picnic),
                                    updated_at: now,
                                },
                            );
                            cache_dirty = true;
                        }
                    }
                    _ => {
                        warn!(item = item.display_name(), "resolved match without usable ids");
                        unresolved_items.push(UnresolvedItem {
                            name: item.name.clone(),
                            qty: item.qty,
                            ah_confidence: ah.confidence,
                            picnic_confidence: picnic.confidence,
                            ah_reason: "missing_selected_id",
                            picnic_reason: "missing_selected_id",
                        });
                    }
                }
            } else {
                unresolved_items.push(UnresolvedItem {
                    name: item.name.clone(),
                    qty: item.qty,
                    ah_confidence: ah.confidence,
                    picnic_confidence: picnic.confidence,
                    ah_reason: ah.reason,
                    picnic_reason: picnic.reason,
                });
            }

            matched.push(ItemMatch {
                input: item.clone(),
                cache_key: key,
                resolved,
                confidence,
                ah,
                picnic,
            });
        }

        if use_cache && cache_dirty {
            if let Err(e) = cache.save(&self.settings.cache_file) {
                warn!(error = %e, "failed to write match cache");
            }
        }

        let summary = MatchSummary {
            total: items.len(),
            resolved: resolved_items.len(),
            unresolved: unresolved_items.len(),
            cache_hits,
        };
        debug!(?summary, "matching finished");

        Ok(MatchReport {
            settings: self.settings.clone(),
            summary,
            items: matched,
            resolved_items,
            unresolved_items,
        })
    }

    async fn resolve_ah(
        &self,
        item: &GroceryItem,
        cached: Option<&CacheEntry>,
    ) -> Result<StoreMatch, BridgeError> {
        if let Some(id) = item.ah_id {
            return Ok(StoreMatch::explicit(EntityId::Numeric(id.as_i64())));
        }
        if let Some(entry) = cached {
            return Ok(StoreMatch::cached(
                EntityId::Numeric(entry.ah_id.as_i64()),
                entry.ah_name.clone(),
            ));
        }
        let Some(query) = item.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            return Ok(StoreMatch::no_query());
        };

        let products = self.ah.search(query, self.settings.search_limit).await?;
        let scored = products
            .iter()
            .map(|p| score_candidate(item, Candidate::from(p), &self.settings))
            .collect();
        Ok(choose_best(scored, &self.settings))
    }

    async fn resolve_picnic(
        &self,
        item: &GroceryItem,
        cached: Option<&CacheEntry>,
    ) -> Result<StoreMatch, BridgeError> {
        if let Some(id) = &item.picnic_id {
            return Ok(StoreMatch::explicit(EntityId::Opaque(id.to_string())));
        }
        if let Some(entry) = cached {
            return Ok(StoreMatch::cached(
                EntityId::Opaque(entry.picnic_id.to_string()),
                entry.picnic_name.clone(),
            ));
        }
        let Some(query) = item.name.as_deref().filter(|n| !n.trim().is_empty()) else {
            return Ok(StoreMatch::no_query());
        };

        let mut products = self.picnic.search(query).await?;
        products.truncate(self.settings.search_limit);
        let scored = products
            .iter()
            .map(|p| score_candidate(item, Candidate::from(p), &self.settings))
            .collect();
        Ok(choose_best(scored, &self.settings))
    }
}

fn ah_selected_id(store_match: &StoreMatch) -> Option<ProductId> {
    match &store_match.selected.as_ref()?.candidate.id {
        EntityId::Numeric(n) => Some(ProductId::new(*n)),
        EntityId::Opaque(s) => s.parse::<i64>().ok().map(ProductId::new),
    }
}

fn picnic_selected_id(store_match: &StoreMatch) -> Option<PicnicProductId> {
    match &store_match.selected.as_ref()?.candidate.id {
        EntityId::Numeric(n) => Some(PicnicProductId::new(n.to_string())),
        EntityId::Opaque(s) => Some(PicnicProductId::new(s.clone())),
    }
}

fn selected_name(store_match: &StoreMatch) -> Option<String> {
    store_match
        .selected
        .as_ref()
        .map(|s| s.candidate.name.clone())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MatchSettings {
        MatchSettings::default()
    }

    fn candidate(name: &str, score_hint: Option<&str>) -> Candidate {
        Candidate {
            id: EntityId::Numeric(1),
            name: name.to_string(),
            brand: None,
            unit_size: score_hint.map(ToString::to_string),
            available: Some(true),
            is_bonus: false,
        }
    }

    fn scored(score: f64) -> ScoredCandidate {
        let mut c = score_candidate(
            &GroceryItem::named("x"),
            candidate("x", None),
            &settings(),
        );
        c.score = score;
        c
    }

    #[test]
    fn exact_name_match_scores_full_marks() {
        let item = GroceryItem::named("halfvolle melk");
        let result = score_candidate(&item, candidate("Halfvolle Melk", None), &settings());
        assert!(result.score >= 99.0);
        assert!(result.score_breakdown.name_exact);
    }

    #[test]
    fn unit_compatibility_separates_lookalikes() {
        let mut item = GroceryItem::named("melk");
        item.unit_hint = Some("1 l".into());
        let close = score_candidate(&item, candidate("melk", Some("1000 ml")), &settings());
        let far = score_candidate(&item, candidate("melk", Some("200 ml")), &settings());
        assert!(close.score > far.score);
        assert_eq!(close.score_breakdown.unit_reason, "unit_close");
        assert_eq!(far.score_breakdown.unit_reason, "unit_very_far");
    }

    #[test]
    fn unavailable_candidates_are_penalized() {
        let item = GroceryItem::named("melk");
        let mut unavailable = candidate("melk", None);
        unavailable.available = Some(false);
        let up = score_candidate(&item, candidate("melk", None), &settings());
        let down = score_candidate(&item, unavailable, &settings());
        assert!(up.score > down.score);
    }

    #[test]
    fn empty_candidate_set_is_unresolved() {
        let decision = choose_best(Vec::new(), &settings());
        assert_eq!(decision.confidence, Confidence::Unresolved);
        assert!(!decision.resolved);
        assert_eq!(decision.reason, "no_candidates");
    }

    #[test]
    fn clear_winner_above_threshold_is_high() {
        let decision = choose_best(vec![scored(85.0), scored(60.0)], &settings());
        assert_eq!(decision.confidence, Confidence::High);
        assert!(decision.resolved);
        assert!((decision.score_gap - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn narrow_gap_above_threshold_is_medium() {
        let decision = choose_best(vec![scored(85.0), scored(82.0)], &settings());
        assert_eq!(decision.confidence, Confidence::Medium);
        assert!(!decision.resolved);
        assert_eq!(decision.reason, "score_gap_too_small");
    }

    #[test]
    fn nothing_above_threshold_is_low() {
        let decision = choose_best(vec![scored(50.0), scored(40.0)], &settings());
        assert_eq!(decision.confidence, Confidence::Low);
        assert!(!decision.resolved);
    }

    #[test]
    fn single_candidate_gap_is_its_own_score() {
        let decision = choose_best(vec![scored(90.0)], &settings());
        assert_eq!(decision.confidence, Confidence::High);
        assert!((decision.score_gap - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn explicit_ids_are_high_confidence_without_search() {
        let decision = StoreMatch::explicit(EntityId::Numeric(42));
        assert_eq!(decision.confidence, Confidence::High);
        assert!(decision.resolved);
        assert_eq!(decision.reason, "explicit_id");
    }

    #[test]
    fn overall_confidence_is_the_provider_minimum() {
        let high = StoreMatch::explicit(EntityId::Numeric(1));
        let medium = choose_best(vec![scored(85.0), scored(82.0)], &settings());
        assert_eq!(
            high.confidence.combined(medium.confidence),
            Confidence::Medium
        );
    }

    #[test]
    fn strict_gate_rejects_any_unresolved_item() {
        let report = MatchReport {
            settings: settings(),
            summary: MatchSummary {
                total: 1,
                resolved: 0,
                unresolved: 1,
                cache_hits: 0,
            },
            items: Vec::new(),
            resolved_items: Vec::new(),
            unresolved_items: vec![UnresolvedItem {
                name: Some("Milk".into()),
                qty: 2,
                ah_confidence: Confidence::High,
                picnic_confidence: Confidence::Medium,
                ah_reason: "high_confidence",
                picnic_reason: "score_gap_too_small",
            }],
        };
        assert!(matches!(
            report.require_all_resolved(),
            Err(BridgeError::UnresolvedMatch {
                total: 1,
                unresolved: 1
            })
        ));
    }

    #[test]
    fn aggregation_merges_duplicates_and_sorts() {
        let batch = aggregate_ah_batch(&[
            (ProductId::new(9), 1),
            (ProductId::new(3), 2),
            (ProductId::new(9), 1),
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, ProductId::new(3));
        assert_eq!(batch[1].id, ProductId::new(9));
        assert_eq!(batch[1].qty, 2);
    }

    #[test]
    fn picnic_aggregation_keeps_first_name() {
        let batch = aggregate_picnic_batch(&[
            (PicnicProductId::new("a"), 1, Some("melk".into())),
            (PicnicProductId::new("a"), 2, Some("andere naam".into())),
        ]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].qty, 3);
        assert_eq!(batch[0].name.as_deref(), Some("melk"));
    }
}
