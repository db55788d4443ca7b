//! Authentication lifecycle for the Albert Heijn mobile backend.
//!
//! # OAuth Flow
//!
//! 1. `begin_interactive_login()` binds a localhost callback listener
//!    and builds the authorization URL (PKCE S256)
//! 2. The user visits the URL in a browser and logs in
//! 3. The backend redirects to the local listener with an authorization
//!    code; the wait is bounded and fails with
//!    [`AuthError::LoginTimeout`] rather than hanging
//! 4. The code is exchanged for tokens, which are persisted
//!
//! Unauthenticated endpoints (search, product detail, bonus listing)
//! run on an anonymous token, fetched and persisted the same way. Every
//! successful exchange or refresh overwrites the token store.

mod store;
mod types;

pub use store::TokenStore;
pub use types::Token;

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::distr::{Alphanumeric, SampleString};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::AuthError;
use types::TokenResponse;

const MOBILE_AUTH_BASE: &str = "https://api.ah.nl/mobile-auth/v1/auth";
const AUTHORIZE_URL: &str = "https://login.ah.nl/secure/oauth/authorize";
const CLIENT_ID: &str = "appie";

// The redirect URI is registered with the backend, so the port is fixed.
const CALLBACK_PORT: u16 = 41999;
const CALLBACK_PATH: &str = "/callback";

/// Refresh this long before actual expiry so a token never expires with
/// a request in flight.
pub(crate) const REFRESH_MARGIN_SECS: i64 = 60;

const CALLBACK_OK_PAGE: &str = "<html><body><p>Login received. You can close this window and \
     return to the terminal.</p></body></html>";

/// Drives token acquisition and refresh against the auth backend.
pub struct AuthManager {
    http: reqwest::Client,
    store: TokenStore,
}

/// An interactive login that has bound its callback listener and is
/// waiting for the browser redirect.
pub struct PendingLogin {
    listener: TcpListener,
    login_url: String,
    state: String,
    verifier: String,
}

impl PendingLogin {
    /// The URL the user must visit to log in.
    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

impl AuthManager {
    /// Create a manager using the given HTTP client and token store.
    #[must_use]
    pub const fn new(http: reqwest::Client, store: TokenStore) -> Self {
        Self { http, store }
    }

    /// The underlying token store.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────
    // Anonymous tokens
    // ─────────────────────────────────────────────────────────────────────

    /// Obtain an anonymous token carrying no user identity.
    ///
    /// Sufficient for search, product detail, and bonus listing.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::Backend`] on network or backend failure.
    #[instrument(skip(self))]
    pub async fn anonymous(&self) -> Result<Token, AuthError> {
        let response = self
            .http
            .post(format!("{MOBILE_AUTH_BASE}/token/anonymous"))
            .json(&serde_json::json!({ "clientId": CLIENT_ID }))
            .send()
            .await?;

        let token = Self::token_from_response(response, None).await?;
        self.store.save(&token)?;
        debug!("anonymous token obtained");
        Ok(token)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Interactive login
    // ─────────────────────────────────────────────────────────────────────

    /// Bind the local callback listener and build the login URL.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::Callback`] if the listener port cannot be
    /// bound (usually another login already in progress).
    pub async fn begin_interactive_login(&self) -> Result<PendingLogin, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", CALLBACK_PORT))
            .await
            .map_err(|e| AuthError::Callback(format!("cannot bind port {CALLBACK_PORT}: {e}")))?;

        let state = Alphanumeric.sample_string(&mut rand::rng(), 16);
        let verifier = Alphanumeric.sample_string(&mut rand::rng(), 64);
        let login_url = authorization_url(&redirect_uri(), &state, &pkce_challenge(&verifier));

        Ok(PendingLogin {
            listener,
            login_url,
            state,
            verifier,
        })
    }

    /// Wait for the browser redirect, then exchange the captured code.
    ///
    /// Suspends until the user completes the external browser flow or
    /// `wait` elapses.
    ///
    /// # Errors
    ///
    /// - [`AuthError::LoginTimeout`] when the redirect never arrives
    /// - [`AuthError::InvalidCode`] when the backend rejects the code
    pub async fn finish_interactive_login(
        &self,
        pending: PendingLogin,
        wait: Duration,
    ) -> Result<Token, AuthError> {
        let code = tokio::time::timeout(
            wait,
            await_callback(&pending.listener, &pending.state),
        )
        .await
        .map_err(|_| AuthError::LoginTimeout(wait.as_secs()))??;

        self.exchange_code(&code, Some(&pending.verifier)).await
    }

    /// Exchange an authorization code for tokens and persist them.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::InvalidCode`] if the backend rejects the
    /// code (expired or already used).
    #[instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<Token, AuthError> {
        let mut body = serde_json::json!({ "clientId": CLIENT_ID, "code": code });
        if let Some(v) = verifier {
            body["codeVerifier"] = serde_json::Value::String(v.to_string());
        }

        let response = self
            .http
            .post(format!("{MOBILE_AUTH_BASE}/token"))
            .json(&body)
            .send()
            .await?;

        if response.status().is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuthError::InvalidCode(snippet(&detail)));
        }

        let token = Self::token_from_response(response, None).await?;
        self.store.save(&token)?;
        Ok(token)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────────────

    /// Refresh an access token and persist the result.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::ReauthRequired`] if the backend rejects
    /// the refresh token; the caller must restart interactive login.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        let response = self
            .http
            .post(format!("{MOBILE_AUTH_BASE}/token/refresh"))
            .json(&serde_json::json!({
                "clientId": CLIENT_ID,
                "refreshToken": refresh_token,
            }))
            .send()
            .await?;

        if response.status().is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            warn!("refresh rejected by backend");
            return Err(AuthError::ReauthRequired(snippet(&detail)));
        }

        let token = Self::token_from_response(response, Some(refresh_token)).await?;
        self.store.save(&token)?;
        debug!("token refreshed");
        Ok(token)
    }

    /// Return a valid user token, refreshing when `expires_at` is
    /// within the safety margin of now.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::ReauthRequired`] when no token is stored
    /// or the refresh is rejected.
    pub async fn ensure_valid(&self) -> Result<Token, AuthError> {
        let Some(token) = self.store.load() else {
            return Err(AuthError::ReauthRequired(
                "no stored token; run `boodschap login` first".to_string(),
            ));
        };
        if !token.needs_refresh(REFRESH_MARGIN_SECS) {
            return Ok(token);
        }
        self.refresh(&token.refresh_token).await
    }

    /// Return a token good enough for public endpoints: the stored one
    /// when valid, otherwise a fresh anonymous token.
    ///
    /// # Errors
    ///
    /// Fails only on network/backend failure; an unusable stored token
    /// falls back to the anonymous flow.
    pub async fn public_token(&self) -> Result<Token, AuthError> {
        if let Some(token) = self.store.load() {
            if !token.needs_refresh(REFRESH_MARGIN_SECS) {
                return Ok(token);
            }
            match self.refresh(&token.refresh_token).await {
                Ok(token) => return Ok(token),
                // A dead refresh token on a public endpoint is not fatal
                Err(AuthError::ReauthRequired(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.anonymous().await
    }

    /// Refresh the stored token once, after a 401 response.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::ReauthRequired`] when there is nothing to
    /// refresh or the backend rejects the refresh.
    pub async fn refresh_stored(&self) -> Result<Token, AuthError> {
        let Some(token) = self.store.load() else {
            return Err(AuthError::ReauthRequired("no stored token".to_string()));
        };
        self.refresh(&token.refresh_token).await
    }

    /// Forget the stored token. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if the file cannot be removed.
    pub fn logout(&self) -> Result<bool, AuthError> {
        Ok(self.store.clear()?)
    }

    async fn token_from_response(
        response: reqwest::Response,
        previous_refresh: Option<&str>,
    ) -> Result<Token, AuthError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AuthError::Backend(format!(
                "HTTP {status}: {}",
                snippet(&text)
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::Backend(format!("malformed token response: {e}")))?;

        Ok(parsed.into_token(chrono::Utc::now().timestamp(), previous_refresh))
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Callback listener
// ─────────────────────────────────────────────────────────────────────────

/// Accept connections until one carries a valid authorization code.
///
/// Stray requests (favicon probes, wrong paths, state mismatches) get an
/// HTTP response and the wait continues; only the backend reporting an
/// OAuth error aborts early.
async fn await_callback(listener: &TcpListener, expected_state: &str) -> Result<String, AuthError> {
    loop {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|e| AuthError::Callback(e.to_string()))?;

        let mut request_line = String::new();
        {
            let mut reader = BufReader::new(&mut stream);
            reader
                .read_line(&mut request_line)
                .await
                .map_err(|e| AuthError::Callback(e.to_string()))?;
        }

        match parse_callback_request(&request_line, expected_state) {
            CallbackOutcome::Code(code) => {
                respond(&mut stream, "200 OK", CALLBACK_OK_PAGE).await;
                return Ok(code);
            }
            CallbackOutcome::Denied(reason) => {
                respond(&mut stream, "200 OK", "<html><body><p>Login was not completed.</p></body></html>").await;
                return Err(AuthError::Backend(format!("login failed: {reason}")));
            }
            CallbackOutcome::Ignore(status) => {
                respond(&mut stream, status, "").await;
            }
        }
    }
}

enum CallbackOutcome {
    Code(String),
    Denied(String),
    Ignore(&'static str),
}

fn parse_callback_request(request_line: &str, expected_state: &str) -> CallbackOutcome {
    let Some(target) = request_line.split_whitespace().nth(1) else {
        return CallbackOutcome::Ignore("400 Bad Request");
    };
    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        return CallbackOutcome::Ignore("400 Bad Request");
    };
    if url.path() != CALLBACK_PATH {
        return CallbackOutcome::Ignore("404 Not Found");
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(reason) = error {
        return CallbackOutcome::Denied(reason);
    }
    if state.as_deref() != Some(expected_state) {
        warn!("callback state mismatch, ignoring request");
        return CallbackOutcome::Ignore("400 Bad Request");
    }
    match code {
        Some(code) if !code.is_empty() => CallbackOutcome::Code(code),
        _ => CallbackOutcome::Ignore("400 Bad Request"),
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    // The browser side is best-effort; a failed write changes nothing.
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

// ─────────────────────────────────────────────────────────────────────────
// URL assembly
// ─────────────────────────────────────────────────────────────────────────

fn redirect_uri() -> String {
    format!("http://127.0.0.1:{CALLBACK_PORT}{CALLBACK_PATH}")
}

fn authorization_url(redirect_uri: &str, state: &str, challenge: &str) -> String {
    format!(
        "{AUTHORIZE_URL}?client_id={}&response_type=code&redirect_uri={}&code_challenge={}&code_challenge_method=S256&state={}",
        urlencoding::encode(CLIENT_ID),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(challenge),
        urlencoding::encode(state)
    )
}

fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_challenge_matches_rfc_7636_vector() {
        // Appendix B of RFC 7636
        assert_eq!(
            pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn authorization_url_carries_all_parameters() {
        let url = authorization_url("http://127.0.0.1:41999/callback", "st4te", "ch4llenge");
        assert!(url.starts_with(AUTHORIZE_URL));
        assert!(url.contains("client_id=appie"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("code_challenge=ch4llenge"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("state=st4te"));
        assert!(url.contains(&urlencoding::encode("http://127.0.0.1:41999/callback").into_owned()));
    }

    #[test]
    fn callback_with_matching_state_yields_code() {
        let line = "GET /callback?code=abc123&state=xyz HTTP/1.1\r\n";
        match parse_callback_request(line, "xyz") {
            CallbackOutcome::Code(code) => assert_eq!(code, "abc123"),
            _ => panic!("expected code"),
        }
    }

    #[test]
    fn callback_with_wrong_state_is_ignored() {
        let line = "GET /callback?code=abc123&state=evil HTTP/1.1\r\n";
        assert!(matches!(
            parse_callback_request(line, "xyz"),
            CallbackOutcome::Ignore(_)
        ));
    }

    #[test]
    fn callback_error_param_aborts() {
        let line = "GET /callback?error=access_denied&state=xyz HTTP/1.1\r\n";
        assert!(matches!(
            parse_callback_request(line, "xyz"),
            CallbackOutcome::Denied(_)
        ));
    }

    #[test]
    fn favicon_probe_is_ignored() {
        let line = "GET /favicon.ico HTTP/1.1\r\n";
        assert!(matches!(
            parse_callback_request(line, "xyz"),
            CallbackOutcome::Ignore("404 Not Found")
        ));
    }

    #[tokio::test]
    async fn login_wait_is_bounded() {
        let store = TokenStore::new(
            tempfile::tempdir().unwrap().path().join("token.json"),
        );
        let manager = AuthManager::new(reqwest::Client::new(), store);
        let pending = manager.begin_interactive_login().await.unwrap();
        let err = manager
            .finish_interactive_login(pending, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::LoginTimeout(_)));
    }
}
