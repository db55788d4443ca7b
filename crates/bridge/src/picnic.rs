//! Picnic collaborator CLI wrapper.
//!
//! The second provider is driven through its own command-line tool
//! (`cli_paths.node` + `cli_paths.picnic_cli`). Only its JSON output is
//! consumed; its internals are its own business. A non-zero exit or
//! unparseable stdout surfaces as a typed error with enough context to
//! explain which command failed.

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, instrument};

use boodschap_core::PicnicProductId;

use crate::config::CliPaths;
use crate::error::BridgeError;

const OUTPUT_PREVIEW_CHARS: usize = 300;

/// Wrapper around the external Picnic CLI.
#[derive(Debug, Clone)]
pub struct PicnicCli {
    node: PathBuf,
    script: PathBuf,
}

/// A Picnic product normalized from the collaborator's search output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PicnicProduct {
    /// Opaque Picnic product id.
    pub id: PicnicProductId,
    /// Product name.
    pub name: String,
    /// Package size as free text, when reported.
    #[serde(rename = "unit", alias = "unit_size")]
    pub unit_size: Option<String>,
    /// Whether the product is available, when reported.
    pub available: Option<bool>,
    /// Price as the collaborator reports it (usually integer cents).
    pub price: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PicnicSearchEnvelope {
    #[serde(default)]
    products: Vec<PicnicProduct>,
}

impl PicnicCli {
    /// Build from configured paths.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MissingPicnicCli`] when no script path is
    /// configured.
    pub fn from_config(paths: &CliPaths) -> Result<Self, BridgeError> {
        let script = paths
            .picnic_cli
            .clone()
            .or_else(|| std::env::var_os("PICNIC_CLI_PATH").map(PathBuf::from))
            .ok_or(BridgeError::MissingPicnicCli)?;
        let node = paths.node.clone().unwrap_or_else(|| PathBuf::from("node"));
        Ok(Self { node, script })
    }

    /// Search Picnic products.
    ///
    /// # Errors
    ///
    /// Returns an error when the collaborator fails or emits invalid
    /// JSON.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<PicnicProduct>, BridgeError> {
        let value = self.run_json(&["search", query]).await?;
        let envelope: PicnicSearchEnvelope = serde_json::from_value(value).map_err(|e| {
            BridgeError::InvalidOutput {
                command: self.describe(&["search"]),
                detail: e.to_string(),
                preview: String::new(),
            }
        })?;
        Ok(envelope.products)
    }

    /// Fetch the current Picnic cart as the collaborator reports it.
    ///
    /// Interpretation of totals (cents vs euros) happens in the
    /// comparator, which knows the configured unit.
    ///
    /// # Errors
    ///
    /// Returns an error when the collaborator fails or emits invalid
    /// JSON.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<serde_json::Value, BridgeError> {
        self.run_json(&["cart"]).await
    }

    /// Add a product to the Picnic cart.
    ///
    /// # Errors
    ///
    /// Returns an error when the collaborator rejects the add.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn add(
        &self,
        id: &PicnicProductId,
        qty: u32,
    ) -> Result<serde_json::Value, BridgeError> {
        let qty = qty.max(1).to_string();
        self.run_json(&["add", id.as_str(), &qty, "--yes"]).await
    }

    fn describe(&self, args: &[&str]) -> String {
        format!(
            "{} {} {}",
            self.node.display(),
            self.script.display(),
            args.join(" ")
        )
    }

    async fn run_json(&self, args: &[&str]) -> Result<serde_json::Value, BridgeError> {
        let command = self.describe(args);
        debug!(command = %command, "running picnic CLI");

        let output = Command::new(&self.node)
            .arg(&self.script)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| BridgeError::Collaborator {
                command: command.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(BridgeError::Collaborator {
                command,
                detail: if detail.is_empty() {
                    format!("exit status {}", output.status)
                } else {
                    detail
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(serde_json::json!({}));
        }

        serde_json::from_str(trimmed).map_err(|e| BridgeError::InvalidOutput {
            command,
            detail: e.to_string(),
            preview: trimmed.chars().take(OUTPUT_PREVIEW_CHARS).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_script_path_is_an_error() {
        let paths = CliPaths::default();
        // Only run when the env fallback is absent, as in CI
        if std::env::var_os("PICNIC_CLI_PATH").is_none() {
            assert!(matches!(
                PicnicCli::from_config(&paths),
                Err(BridgeError::MissingPicnicCli)
            ));
        }
    }

    #[test]
    fn node_defaults_to_path_lookup() {
        let paths = CliPaths {
            picnic_cli: Some(PathBuf::from("/opt/picnic-cli.mjs")),
            ..CliPaths::default()
        };
        let cli = PicnicCli::from_config(&paths).unwrap();
        assert_eq!(cli.node, PathBuf::from("node"));
    }

    #[test]
    fn search_envelope_parses_collaborator_shape() {
        let json = r#"{
            "products": [
                { "id": "s1019122", "name": "Picnic halfvolle melk", "unit": "1 liter",
                  "available": true, "price": 109 }
            ]
        }"#;
        let envelope: PicnicSearchEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.products.len(), 1);
        let product = &envelope.products[0];
        assert_eq!(product.id, PicnicProductId::new("s1019122"));
        assert_eq!(product.unit_size.as_deref(), Some("1 liter"));
    }

    #[tokio::test]
    async fn failing_collaborator_surfaces_command_and_detail() {
        let cli = PicnicCli {
            node: PathBuf::from("/nonexistent-node-binary"),
            script: PathBuf::from("/nonexistent-script.mjs"),
        };
        let err = cli.cart().await.unwrap_err();
        match err {
            BridgeError::Collaborator { command, .. } => {
                assert!(command.contains("nonexistent-script.mjs"));
            }
            other => panic!("expected Collaborator error, got {other}"),
        }
    }
}
