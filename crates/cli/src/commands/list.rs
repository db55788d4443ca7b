//! Shopping list commands.

use serde_json::{Value, json};

use boodschap_ah::AhClient;
use boodschap_core::{ListEntryId, ProductId, Provider};

use crate::error::CliError;
use crate::input;

use super::batch_outcome;

pub async fn show(client: &AhClient) -> Result<Value, CliError> {
    let items = client.list_items().await?;
    Ok(json!({ "items": items }))
}

pub async fn add(client: &AhClient, id: i64, qty: u32) -> Result<Value, CliError> {
    let id = ProductId::new(id);
    client.add_list_item(id, qty).await?;
    Ok(json!({ "ok": true, "added": { "id": id, "qty": qty.max(1) } }))
}

pub async fn remove(client: &AhClient, entry: &str) -> Result<Value, CliError> {
    let entry = ListEntryId::new(entry);
    client.remove_list_item(&entry).await?;
    Ok(json!({ "ok": true, "removed": entry }))
}

/// `batch-add`: JSON array of `{id, qty}` on stdin, applied to the
/// shopping list sequentially.
pub async fn batch_add(client: &AhClient) -> Result<Value, CliError> {
    let entries = input::read_batch_entries()?;
    let report = client.batch_add_list(&entries).await;
    batch_outcome(report, Provider::AlbertHeijn)
}
