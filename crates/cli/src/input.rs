//! Reading item payloads from files, inline JSON, and standard input.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;

use boodschap_ah::BatchEntry;
use boodschap_core::GroceryItem;

use crate::error::CliError;

/// Mutually exclusive item sources for cross-store commands.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ItemsInput {
    /// Path to a file holding a JSON array of items.
    #[arg(long)]
    pub items_file: Option<PathBuf>,

    /// Inline JSON array of items.
    #[arg(long)]
    pub items_json: Option<String>,

    /// Read the JSON array of items from stdin.
    #[arg(long)]
    pub items_stdin: bool,
}

/// Read grocery items from whichever source was selected.
///
/// # Errors
///
/// Returns an input error with a stable code and a hint the caller can
/// relay.
pub fn read_items(input: &ItemsInput) -> Result<Vec<GroceryItem>, CliError> {
    if let Some(path) = &input.items_file {
        let data = std::fs::read_to_string(path).map_err(|e| CliError::Input {
            code: "missing_items_file",
            detail: format!("cannot read {}: {e}", path.display()),
            hint: Some("create the file first, or use --items-json / --items-stdin"),
        })?;
        return parse_items(&data, "items file");
    }
    if let Some(raw) = &input.items_json {
        return parse_items(raw, "--items-json");
    }
    // clap's group(required) guarantees items_stdin here
    let raw = read_stdin()?;
    parse_items(&raw, "stdin")
}

/// Read `{id, qty}` batch entries from stdin.
///
/// # Errors
///
/// Returns an input error for empty stdin, bad JSON, or zero
/// quantities.
pub fn read_batch_entries() -> Result<Vec<BatchEntry>, CliError> {
    let raw = read_stdin()?;
    let entries: Vec<BatchEntry> = serde_json::from_str(&raw).map_err(|e| CliError::Input {
        code: "invalid_items_json",
        detail: format!("invalid JSON on stdin: {e}"),
        hint: Some(r#"expected an array like [{"id": 436469, "qty": 2}]"#),
    })?;

    if let Some(bad) = entries.iter().find(|e| e.qty == 0) {
        return Err(CliError::Input {
            code: "invalid_items",
            detail: format!("qty must be >= 1 (got 0 for id {})", bad.id),
            hint: None,
        });
    }
    Ok(entries)
}

fn read_stdin() -> Result<String, CliError> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| CliError::Input {
            code: "stdin_read_error",
            detail: e.to_string(),
            hint: None,
        })?;
    if raw.trim().is_empty() {
        return Err(CliError::Input {
            code: "empty_stdin",
            detail: "no input received on stdin".into(),
            hint: Some(r#"pipe a JSON array to stdin, e.g. echo '[{"name":"bananen","qty":1}]' | ..."#),
        });
    }
    Ok(raw)
}

fn parse_items(raw: &str, source: &str) -> Result<Vec<GroceryItem>, CliError> {
    let items: Vec<GroceryItem> = serde_json::from_str(raw).map_err(|e| CliError::Input {
        code: "invalid_items_json",
        detail: format!("invalid JSON from {source}: {e}"),
        hint: Some(r#"example: [{"name": "bananen", "qty": 1}]"#),
    })?;
    if items.is_empty() {
        return Err(CliError::Input {
            code: "invalid_items",
            detail: format!("empty items array from {source}"),
            hint: None,
        });
    }
    Ok(items)
}
