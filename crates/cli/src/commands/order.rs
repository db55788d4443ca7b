//! Order cart commands.

use serde_json::{Value, json};

use boodschap_ah::AhClient;
use boodschap_core::{ProductId, Provider};

use crate::error::CliError;
use crate::input;

use super::batch_outcome;

pub async fn show(client: &AhClient) -> Result<Value, CliError> {
    let mut snapshot = client.order().await?;
    // The raw payload is audit detail; cart-both keeps it, `order show`
    // does not
    snapshot.raw = Value::Null;
    Ok(serde_json::to_value(snapshot)?)
}

pub async fn add(client: &AhClient, id: i64, qty: u32) -> Result<Value, CliError> {
    let id = ProductId::new(id);
    client.add_order_item(id, qty).await?;
    Ok(json!({ "ok": true, "added": { "id": id, "qty": qty.max(1) } }))
}

pub async fn clear(client: &AhClient) -> Result<Value, CliError> {
    client.clear_order().await?;
    Ok(json!({ "ok": true, "cleared": true }))
}

/// `batch-add-to-order`: JSON array of `{id, qty}` on stdin, applied to
/// the order cart sequentially.
pub async fn batch_add(client: &AhClient) -> Result<Value, CliError> {
    let entries = input::read_batch_entries()?;
    let report = client.batch_add_order(&entries).await;
    batch_outcome(report, Provider::AlbertHeijn)
}
