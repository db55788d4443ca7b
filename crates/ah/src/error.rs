//! Error types for the Albert Heijn client.

use thiserror::Error;

/// Errors from the authentication lifecycle.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The interactive browser flow did not complete in time.
    #[error("login timed out after {0} seconds")]
    LoginTimeout(u64),

    /// The backend rejected the authorization code (expired or already
    /// used).
    #[error("authorization code rejected: {0}")]
    InvalidCode(String),

    /// A refresh was rejected; the caller must restart interactive
    /// login.
    #[error("re-authentication required: {0}")]
    ReauthRequired(String),

    /// Reading or writing the token file failed.
    #[error("token store error: {0}")]
    Store(#[from] std::io::Error),

    /// The local login callback listener failed.
    #[error("callback listener error: {0}")]
    Callback(String),

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth backend returned an unexpected response.
    #[error("auth backend error: {0}")]
    Backend(String),
}

/// Errors from API operations.
#[derive(Debug, Error)]
pub enum AhError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Throttled by the backend. Surfaced, never silently retried: the
    /// backend's limits are undocumented, so no retry policy is assumed.
    #[error("rate limited{}", retry_after_suffix(.0))]
    RateLimited(Option<u64>),

    /// 5xx or a malformed response envelope.
    #[error("backend error: {0}")]
    Backend(String),

    /// The caller supplied arguments the backend would reject anyway.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The GraphQL endpoint returned errors.
    #[error("GraphQL errors: {0}")]
    GraphQL(String),

    /// Authentication failed. A single 401 triggers one refresh-and-
    /// retry; this surfaces when that is not enough.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
}

impl AhError {
    /// Stable machine-readable code for JSON error output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "network_error",
            Self::Parse(_) => "parse_error",
            Self::NotFound(_) => "not_found",
            Self::RateLimited(_) => "rate_limited",
            Self::Backend(_) => "backend_error",
            Self::InvalidInput(_) => "invalid_args",
            Self::GraphQL(_) => "graphql_error",
            Self::Auth(err) => err.code(),
        }
    }
}

impl AuthError {
    /// Stable machine-readable code for JSON error output.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::LoginTimeout(_) => "login_timeout",
            Self::InvalidCode(_) => "invalid_code",
            Self::ReauthRequired(_) => "reauth_required",
            Self::Store(_) => "token_store_error",
            Self::Callback(_) => "callback_error",
            Self::Http(_) => "network_error",
            Self::Backend(_) => "auth_backend_error",
        }
    }
}

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    retry_after.map_or_else(String::new, |secs| format!(", retry after {secs} seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display_includes_retry_after() {
        assert_eq!(
            AhError::RateLimited(Some(30)).to_string(),
            "rate limited, retry after 30 seconds"
        );
        assert_eq!(AhError::RateLimited(None).to_string(), "rate limited");
    }

    #[test]
    fn auth_errors_keep_their_code_through_wrapping() {
        let err = AhError::Auth(AuthError::ReauthRequired("refresh rejected".into()));
        assert_eq!(err.code(), "reauth_required");
    }

    #[test]
    fn not_found_display() {
        assert_eq!(
            AhError::NotFound("product 123".into()).to_string(),
            "not found: product 123"
        );
    }
}
