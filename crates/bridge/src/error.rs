//! Error types for the cross-store bridge.

use boodschap_core::{Provider, ProductId};
use thiserror::Error;

use boodschap_ah::AhError;

/// Errors from bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No Picnic CLI is configured.
    #[error("picnic CLI not configured: set cli_paths.picnic_cli in the config file")]
    MissingPicnicCli,

    /// A collaborator command exited non-zero.
    #[error("collaborator command failed ({command}): {detail}")]
    Collaborator { command: String, detail: String },

    /// A collaborator produced output that is not valid JSON.
    #[error("collaborator produced invalid JSON ({command}): {detail}; output started with: {preview}")]
    InvalidOutput {
        command: String,
        detail: String,
        preview: String,
    },

    /// The items payload could not be interpreted.
    #[error("invalid items payload: {0}")]
    InvalidItems(String),

    /// A mutating command ran without confirmation.
    #[error("mutating command requires --yes (or --dry-run)")]
    ConfirmationRequired,

    /// Matching did not reach the required confidence for every item;
    /// no writes were performed.
    #[error("{unresolved} of {total} items could not be matched with high confidence; no cart updates were applied")]
    UnresolvedMatch { total: usize, unresolved: usize },

    /// Some batch items were applied and some failed; nothing is rolled
    /// back.
    #[error("partial batch failure on {provider}: failed ids {}", format_ids(.failed))]
    PartialBatchFailure {
        provider: Provider,
        failed: Vec<ProductId>,
    },

    /// Albert Heijn client failure.
    #[error(transparent)]
    Ah(#[from] AhError),

    /// Configuration problem.
    #[error("config error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Stable machine-readable code for JSON error output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPicnicCli => "missing_picnic_cli",
            Self::Collaborator { .. } => "command_failed",
            Self::InvalidOutput { .. } => "invalid_json_output",
            Self::InvalidItems(_) => "invalid_items",
            Self::ConfirmationRequired => "confirmation_required",
            Self::UnresolvedMatch { .. } => "unresolved_matches",
            Self::PartialBatchFailure { .. } => "partial_batch_failure",
            Self::Ah(err) => err.code(),
            Self::Config(_) => "config_error",
        }
    }
}

fn format_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_batch_failure_names_the_failed_ids() {
        let err = BridgeError::PartialBatchFailure {
            provider: Provider::AlbertHeijn,
            failed: vec![ProductId::new(7), ProductId::new(9)],
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('9'));
        assert_eq!(err.code(), "partial_batch_failure");
    }

    #[test]
    fn ah_errors_keep_their_code() {
        let err = BridgeError::Ah(AhError::NotFound("product 1".into()));
        assert_eq!(err.code(), "not_found");
    }
}
