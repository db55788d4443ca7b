//! Search, product detail, and bonus listing. All work anonymously.

use serde_json::{Value, json};

use boodschap_ah::AhClient;
use boodschap_core::ProductId;

use crate::error::CliError;

pub async fn search(client: &AhClient, query: &str, limit: usize) -> Result<Value, CliError> {
    let products = client.search(query, limit).await?;
    Ok(json!({ "query": query, "products": products }))
}

pub async fn product(client: &AhClient, id: i64) -> Result<Value, CliError> {
    let product = client.product(ProductId::new(id)).await?;
    Ok(serde_json::to_value(product)?)
}

pub async fn bonus(client: &AhClient) -> Result<Value, CliError> {
    let products = client.bonus().await?;
    Ok(json!({ "products": products }))
}
