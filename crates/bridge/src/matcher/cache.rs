//! File-backed cache of resolved matches.
//!
//! Keyed by normalized item name (plus brand/unit hints). Entries are
//! trusted wholesale while inside the TTL and ignored entirely once it
//! elapses; there is no partial trust.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use boodschap_core::{GroceryItem, PicnicProductId, ProductId};

use super::normalize::normalize_text;

/// A resolved match remembered from an earlier run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Resolved Albert Heijn product id.
    pub ah_id: ProductId,
    /// Name of the AH product at resolution time.
    pub ah_name: Option<String>,
    /// Resolved Picnic product id.
    pub picnic_id: PicnicProductId,
    /// Name of the Picnic product at resolution time.
    pub picnic_name: Option<String>,
    /// When the entry was written.
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry is still inside the TTL at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl_seconds: u64) -> bool {
        let age = now.signed_duration_since(self.updated_at);
        age >= chrono::Duration::zero()
            && age <= chrono::Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX))
    }
}

/// The on-disk match cache.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MatchCache {
    #[serde(default)]
    items: BTreeMap<String, CacheEntry>,
}

impl MatchCache {
    /// Load the cache, treating a missing or corrupt file as empty.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let Ok(data) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&data) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt match cache, starting fresh");
                Self::default()
            }
        }
    }

    /// Persist the cache.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, data)?;
        debug!(path = %path.display(), entries = self.items.len(), "match cache saved");
        Ok(())
    }

    /// A still-valid entry for `key`, if any.
    #[must_use]
    pub fn valid_entry(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Option<&CacheEntry> {
        self.items
            .get(key)
            .filter(|entry| entry.is_valid_at(now, ttl_seconds))
    }

    /// Remember a resolved match.
    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        if key.is_empty() {
            return;
        }
        self.items.insert(key, entry);
    }
}

/// Cache key for an item: normalized name, brand, and unit hint.
#[must_use]
pub fn cache_key(item: &GroceryItem) -> String {
    let parts = [
        normalize_text(item.name.as_deref().unwrap_or("")),
        normalize_text(item.brand.as_deref().unwrap_or("")),
        normalize_text(item.unit_hint.as_deref().unwrap_or("")),
    ];
    parts.join("|").trim_matches('|').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(updated_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            ah_id: ProductId::new(1),
            ah_name: Some("AH Halfvolle melk".into()),
            picnic_id: PicnicProductId::new("s100"),
            picnic_name: Some("Picnic melk".into()),
            updated_at,
        }
    }

    #[test]
    fn entry_expires_after_ttl() {
        let now = Utc::now();
        let fresh = entry(now - chrono::Duration::seconds(100));
        let stale = entry(now - chrono::Duration::seconds(1000));
        assert!(fresh.is_valid_at(now, 500));
        assert!(!stale.is_valid_at(now, 500));
    }

    #[test]
    fn future_timestamps_are_not_trusted() {
        let now = Utc::now();
        let from_the_future = entry(now + chrono::Duration::seconds(60));
        assert!(!from_the_future.is_valid_at(now, 500));
    }

    #[test]
    fn valid_entry_filters_expired_ones() {
        let now = Utc::now();
        let mut cache = MatchCache::default();
        cache.insert(
            "melk".into(),
            entry(now - chrono::Duration::seconds(1000)),
        );
        assert!(cache.valid_entry("melk", now, 500).is_none());
        assert!(cache.valid_entry("melk", now, 2000).is_some());
    }

    #[test]
    fn cache_roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = MatchCache::default();
        cache.insert("melk".into(), entry(Utc::now()));
        cache.save(&path).unwrap();

        let loaded = MatchCache::load(&path);
        assert!(loaded.items.contains_key("melk"));
    }

    #[test]
    fn corrupt_cache_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "][").unwrap();
        let loaded = MatchCache::load(&path);
        assert!(loaded.items.is_empty());
    }

    #[test]
    fn cache_key_combines_normalized_hints() {
        let mut item = GroceryItem::named("Halfvolle Melk");
        item.brand = Some("AH".into());
        item.unit_hint = Some("1 L".into());
        assert_eq!(cache_key(&item), "halfvolle melk|ah|1 l");
    }

    #[test]
    fn cache_key_trims_empty_parts() {
        let item = GroceryItem::named("Melk");
        assert_eq!(cache_key(&item), "melk");
    }
}
