//! Login and logout.

use std::time::Duration;

use serde_json::{Value, json};

use boodschap_ah::AhClient;

use crate::error::CliError;

/// Interactive browser login. Prints the login URL to stderr and blocks
/// (bounded) until the redirect arrives.
pub async fn login(client: &AhClient, timeout_secs: u64) -> Result<Value, CliError> {
    let pending = client.auth().begin_interactive_login().await?;

    eprintln!();
    eprintln!("Open this URL in your browser to log in:");
    eprintln!();
    eprintln!("  {}", pending.login_url());
    eprintln!();
    eprintln!("Waiting for the redirect (up to {timeout_secs}s)...");

    let token = client
        .auth()
        .finish_interactive_login(pending, Duration::from_secs(timeout_secs))
        .await?;

    Ok(json!({
        "ok": true,
        "expires_at": token.expires_at,
        "token_file": client.auth().store().path(),
    }))
}

/// Forget the stored token.
pub fn logout(client: &AhClient) -> Result<Value, CliError> {
    let removed = client.auth().logout()?;
    Ok(json!({ "ok": true, "removed": removed }))
}
