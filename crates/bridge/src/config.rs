//! Bridge configuration loaded from a JSON file.
//!
//! Every key has a default, so a missing file yields a working (if
//! Picnic-less) configuration. A relative `matching.cache_file` resolves
//! against the config file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use boodschap_ah::AhConfig;

use crate::compare::PicnicUnit;
use crate::error::BridgeError;

const DEFAULT_THRESHOLD: f64 = 72.0;
const DEFAULT_GAP: f64 = 8.0;
// 21 days, matching how long shelf assortments stay stable in practice.
const DEFAULT_CACHE_TTL_SECONDS: u64 = 1_814_400;
const DEFAULT_SEARCH_LIMIT: usize = 8;
const DEFAULT_MAX_ALTERNATIVES: usize = 3;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Paths to collaborator executables.
    pub cli_paths: CliPaths,
    /// Matcher thresholds and cache settings.
    pub matching: MatchSettings,
    /// Always recommend Albert Heijn at checkout, whatever the totals.
    pub always_ah: bool,
    /// Always recommend Picnic at checkout, whatever the totals.
    pub always_picnic: bool,
    /// Picnic-specific defaults.
    pub picnic: PicnicSettings,
    /// Albert Heijn client settings.
    pub ah: AhConfig,
}

/// Paths to the collaborator executables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliPaths {
    /// Accepted for compatibility with older bridge configs; the AH
    /// client is built in, so this path is never invoked.
    pub appie_cli: Option<PathBuf>,
    /// Node binary used to run the Picnic CLI. Defaults to `node` on
    /// PATH.
    pub node: Option<PathBuf>,
    /// Path to the Picnic CLI script.
    pub picnic_cli: Option<PathBuf>,
}

/// Picnic-specific defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PicnicSettings {
    /// How numeric Picnic totals are interpreted when no flag is given.
    pub price_unit: PicnicUnit,
}

/// Matcher thresholds and cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Minimum score for a candidate to be accepted at all.
    pub threshold: f64,
    /// Minimum lead over the runner-up for high confidence.
    pub gap: f64,
    /// How long resolved matches stay trusted in the cache.
    pub cache_ttl_seconds: u64,
    /// Candidates fetched per provider per item.
    pub search_limit: usize,
    /// Runner-up candidates reported per item.
    pub max_alternatives: usize,
    /// Nudge bonus-priced candidates ahead on near-ties.
    pub prefer_bonus_tiebreak: bool,
    /// Match cache location; relative paths resolve against the config
    /// file's directory.
    pub cache_file: PathBuf,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            gap: DEFAULT_GAP,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            prefer_bonus_tiebreak: true,
            cache_file: PathBuf::from("match-cache.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults; a present but unparseable
    /// file is an error (silently ignoring a typo'd config is worse
    /// than failing).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] for unreadable or invalid JSON,
    /// or for contradictory settings.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let mut config = if path.exists() {
            let data = std::fs::read_to_string(path)
                .map_err(|e| BridgeError::Config(format!("cannot read {}: {e}", path.display())))?;
            serde_json::from_str::<Self>(&data)
                .map_err(|e| BridgeError::Config(format!("invalid JSON in {}: {e}", path.display())))?
        } else {
            Self::default()
        };

        if config.always_ah && config.always_picnic {
            return Err(BridgeError::Config(
                "always_ah and always_picnic are mutually exclusive".to_string(),
            ));
        }

        // Anchor a relative cache file next to the config file
        if config.matching.cache_file.is_relative()
            && let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            config.matching.cache_file = dir.join(&config.matching.cache_file);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/config.json")).unwrap();
        assert!((config.matching.threshold - DEFAULT_THRESHOLD).abs() < f64::EPSILON);
        assert_eq!(config.matching.search_limit, DEFAULT_SEARCH_LIMIT);
        assert!(!config.always_ah);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{broken").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn contradictory_preferences_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"always_ah": true, "always_picnic": true}"#).unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn relative_cache_file_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"matching": {"cache_file": "cache.json"}}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.matching.cache_file, dir.path().join("cache.json"));
    }

    #[test]
    fn recognizes_legacy_appie_cli_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"cli_paths": {"appie_cli": "/usr/local/bin/appie-cli"}}"#,
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert!(config.cli_paths.appie_cli.is_some());
    }
}
