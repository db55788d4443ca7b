//! OAuth token types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

// Fallback lifetime when the backend omits expires_in. The mobile
// backend hands out two-hour tokens.
const DEFAULT_LIFETIME_SECS: i64 = 7200;

/// An OAuth token as persisted in the token file.
///
/// This is the exact on-disk JSON shape; do not rename fields.
/// Implements `Debug` manually to redact the credential fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token for API requests.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: String,
    /// Unix timestamp at which `access_token` expires.
    pub expires_at: i64,
    /// Token type, normally "Bearer".
    pub token_type: String,
}

impl Token {
    /// Whether the token needs a refresh, applying a safety margin so a
    /// request never departs with a token about to expire in flight.
    #[must_use]
    pub fn needs_refresh(&self, margin_secs: i64) -> bool {
        self.needs_refresh_at(Utc::now().timestamp(), margin_secs)
    }

    /// Testable variant of [`Self::needs_refresh`] with an explicit
    /// clock.
    #[must_use]
    pub const fn needs_refresh_at(&self, now: i64, margin_secs: i64) -> bool {
        now >= self.expires_at - margin_secs
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Raw token response from the auth endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Convert into a persisted [`Token`].
    ///
    /// Refresh responses may omit the refresh token; the previous one
    /// stays valid and is carried over.
    pub(crate) fn into_token(self, now: i64, previous_refresh: Option<&str>) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string))
                .unwrap_or_default(),
            expires_at: now + self.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: i64) -> Token {
        Token {
            access_token: "acc".into(),
            refresh_token: "ref".into(),
            expires_at,
            token_type: "Bearer".into(),
        }
    }

    #[test]
    fn fresh_token_needs_no_refresh() {
        assert!(!token(1000).needs_refresh_at(900, 60));
    }

    #[test]
    fn margin_triggers_early_refresh() {
        // 50s of validity left is inside the 60s margin
        assert!(token(1000).needs_refresh_at(950, 60));
    }

    #[test]
    fn expired_token_needs_refresh() {
        assert!(token(1000).needs_refresh_at(2000, 60));
    }

    #[test]
    fn persisted_shape_is_stable() {
        let json = serde_json::to_value(token(1234)).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            ["access_token", "refresh_token", "expires_at", "token_type"]
        );
    }

    #[test]
    fn debug_redacts_credentials() {
        let tok = Token {
            access_token: "super-secret-access".into(),
            refresh_token: "super-secret-refresh".into(),
            expires_at: 1,
            token_type: "Bearer".into(),
        };
        let out = format!("{tok:?}");
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("super-secret-access"));
        assert!(!out.contains("super-secret-refresh"));
    }

    #[test]
    fn refresh_response_without_refresh_token_keeps_previous() {
        let resp = TokenResponse {
            access_token: "new".into(),
            refresh_token: None,
            expires_in: Some(100),
            token_type: None,
        };
        let tok = resp.into_token(50, Some("old-refresh"));
        assert_eq!(tok.refresh_token, "old-refresh");
        assert_eq!(tok.expires_at, 150);
        assert_eq!(tok.token_type, "Bearer");
    }
}
