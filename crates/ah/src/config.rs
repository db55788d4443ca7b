//! Albert Heijn client configuration.
//!
//! Loaded as the `ah` section of the shared JSON config file. Every key
//! has a default so a missing section still yields a working client.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const TOKEN_FILE_NAME: &str = "ah-token.json";

/// Configuration for [`crate::AhClient`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AhConfig {
    /// Where OAuth tokens are persisted. Defaults to
    /// `<user config dir>/boodschap/ah-token.json`.
    pub token_file: Option<PathBuf>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AhConfig {
    fn default() -> Self {
        Self {
            token_file: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AhConfig {
    /// Resolved token file path.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.token_file.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("boodschap")
                .join(TOKEN_FILE_NAME)
        })
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
