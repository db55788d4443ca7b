//! JSON output rendering.
//!
//! Everything on stdout is JSON for the calling agent; human-oriented
//! chatter (login instructions, logs) goes to stderr.

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::CliError;

/// Pretty-print a value to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            // Should be unreachable for our own types; still, never
            // leave stdout empty on success paths
            eprintln!("failed to serialize output: {e}");
            println!("{{}}");
        }
    }
}

/// Print a failure as a JSON error object.
///
/// Structured payload fields (match summaries, batch reports) merge
/// into the top-level object so the caller can act on them directly.
pub fn print_error(error: &CliError) {
    let mut body = json!({
        "error": error.code(),
        "detail": error.to_string(),
    });

    if let Some(hint) = error.hint()
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("hint".to_string(), Value::String(hint.to_string()));
    }

    if let Some(Value::Object(payload)) = error.payload()
        && let Some(obj) = body.as_object_mut()
    {
        for (key, value) in payload {
            obj.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    print_json(&body);
}
