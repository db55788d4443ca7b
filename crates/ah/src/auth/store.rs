//! File-backed token persistence.
//!
//! The token file holds live credentials and must never land in version
//! control. Saves go through a temp-file-then-rename so a concurrent
//! reader never observes a half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::types::Token;

/// Persists OAuth tokens at a fixed path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token.
    ///
    /// A missing or unparseable file is treated as "no token": the
    /// caller falls back to a fresh login rather than failing.
    #[must_use]
    pub fn load(&self) -> Option<Token> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no stored token");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt token file, ignoring");
                None
            }
        }
    }

    /// Atomically persist a token.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory cannot be
    /// created or the write/rename fails.
    pub fn save(&self, token: &Token) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            let data = serde_json::to_vec_pretty(token)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "token saved");
        Ok(())
    }

    /// Delete the stored token. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for anything other than the
    /// file already being absent.
    pub fn clear(&self) -> Result<bool, std::io::Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_token() -> Token {
        Token {
            access_token: "acc".into(),
            refresh_token: "ref".into(),
            expires_at: 1_999_999_999,
            token_type: "Bearer".into(),
        }
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample_token()).unwrap();
        assert_eq!(store.load(), Some(sample_token()));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested/deeper/token.json"));
        store.save(&sample_token()).unwrap();
        assert!(store.load().is_some());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample_token()).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["token.json"]);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(TokenStore::new(path).load(), None);
    }

    #[test]
    fn clear_reports_whether_a_file_existed() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(!store.clear().unwrap());
        store.save(&sample_token()).unwrap();
        assert!(store.clear().unwrap());
        assert_eq!(store.load(), None);
    }
}
