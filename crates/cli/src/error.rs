//! Unified CLI error with stable machine-readable codes.
//!
//! The consumer on the other side of stdout is an agent, not a human;
//! every failure must carry a code and enough context to explain what
//! failed and ask the user what to do, rather than retry blindly.

use thiserror::Error;

use boodschap_ah::{AhError, AuthError};
use boodschap_bridge::BridgeError;

/// Anything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Albert Heijn client failure.
    #[error(transparent)]
    Ah(#[from] AhError),

    /// Authentication failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Bridge failure.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Bad command input (items payload, stdin, arguments).
    #[error("{detail}")]
    Input {
        code: &'static str,
        detail: String,
        hint: Option<&'static str>,
    },

    /// A failure that carries structured context for the caller
    /// (unresolved matches, partial batch results).
    #[error("{detail}")]
    WithPayload {
        code: &'static str,
        detail: String,
        payload: serde_json::Value,
    },

    /// Serialization of our own output failed.
    #[error("internal error: {0}")]
    Internal(#[from] serde_json::Error),
}

impl CliError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ah(e) => e.code(),
            Self::Auth(e) => e.code(),
            Self::Bridge(e) => e.code(),
            Self::Input { code, .. } | Self::WithPayload { code, .. } => *code,
            Self::Internal(_) => "internal_error",
        }
    }

    /// Optional hint for the caller.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Input { hint, .. } => *hint,
            _ => None,
        }
    }

    /// Structured context, when the failure carries any.
    #[must_use]
    pub const fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::WithPayload { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_pass_through_from_lower_layers() {
        let err = CliError::Bridge(BridgeError::ConfirmationRequired);
        assert_eq!(err.code(), "confirmation_required");

        let err = CliError::Ah(AhError::RateLimited(None));
        assert_eq!(err.code(), "rate_limited");
    }

    #[test]
    fn input_errors_keep_their_hint() {
        let err = CliError::Input {
            code: "empty_stdin",
            detail: "no input received on stdin".into(),
            hint: Some("pipe a JSON array to stdin"),
        };
        assert_eq!(err.code(), "empty_stdin");
        assert!(err.hint().is_some());
    }
}
