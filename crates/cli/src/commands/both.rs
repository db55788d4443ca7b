//! Cross-store commands: search, match, strict add, cart fetch, and
//! checkout comparison.

use serde_json::{Value, json};
use tracing::warn;

use boodschap_ah::{AhClient, BatchEntry};
use boodschap_bridge::compare::{self, CompareOptions, PicnicUnit};
use boodschap_bridge::matcher::{
    Matcher, PicnicBatchEntry, aggregate_ah_batch, aggregate_picnic_batch,
};
use boodschap_bridge::{AppConfig, BridgeError, PicnicCli};
use boodschap_core::PicnicProductId;

use crate::error::CliError;
use crate::input::{self, ItemsInput};

/// Everything the cross-store commands need.
pub struct BridgeContext<'a> {
    pub ah: &'a AhClient,
    pub picnic: &'a PicnicCli,
    pub config: &'a AppConfig,
}

/// Arguments of `add-both`.
pub struct AddBothArgs {
    pub input: ItemsInput,
    pub yes: bool,
    pub dry_run: bool,
    pub auto_match: bool,
    pub search_limit: Option<usize>,
    pub no_cache: bool,
}

/// `search-both`: one query against both providers.
pub async fn search_both(
    ctx: &BridgeContext<'_>,
    query: &str,
    limit: usize,
) -> Result<Value, CliError> {
    let ah = ctx.ah.search(query, limit).await?;
    let mut picnic = ctx.picnic.search(query).await?;
    picnic.truncate(limit);
    Ok(json!({ "query": query, "ah": ah, "picnic": picnic }))
}

/// `match-items`: the full matching report for a list of items.
pub async fn match_items(
    ctx: &BridgeContext<'_>,
    items_input: &ItemsInput,
    search_limit: Option<usize>,
    no_cache: bool,
) -> Result<Value, CliError> {
    let items = input::read_items(items_input)?;
    let settings = effective_settings(ctx, search_limit);
    let matcher = Matcher::new(ctx.ah, ctx.picnic, settings);
    let report = matcher.match_items(&items, !no_cache).await?;
    Ok(serde_json::to_value(report)?)
}

/// `add-both`: add items to both carts.
///
/// Planning is all-or-nothing: with `--auto-match`, any item below high
/// confidence aborts before a single write. Execution is not
/// transactional across providers; per-backend failures surface for
/// manual reconciliation, with no cross-provider rollback.
pub async fn add_both(ctx: &BridgeContext<'_>, args: AddBothArgs) -> Result<Value, CliError> {
    if !args.yes && !args.dry_run {
        return Err(BridgeError::ConfirmationRequired.into());
    }

    let items = input::read_items(&args.input)?;

    let (ah_batch, picnic_batch, skipped) = if args.auto_match {
        let settings = effective_settings(ctx, args.search_limit);
        let matcher = Matcher::new(ctx.ah, ctx.picnic, settings);
        let report = matcher.match_items(&items, !args.no_cache).await?;

        if let Err(gate) = report.require_all_resolved() {
            return Err(CliError::WithPayload {
                code: gate.code(),
                detail: gate.to_string(),
                payload: json!({
                    "summary": report.summary,
                    "unresolved_items": report.unresolved_items,
                }),
            });
        }

        let (ah_batch, picnic_batch) = report.resolved_batches();
        (ah_batch, picnic_batch, Vec::new())
    } else {
        plan_from_explicit_ids(&items)
    };

    let planned = json!({
        "ah_count": ah_batch.len(),
        "picnic_count": picnic_batch.len(),
        "skipped_count": skipped.len(),
    });

    if args.dry_run {
        return Ok(json!({
            "dry_run": true,
            "auto_match": args.auto_match,
            "planned": planned,
            "skipped": skipped,
            "ah": { "planned_items": ah_batch },
            "picnic": picnic_batch
                .iter()
                .map(|item| json!({ "planned_item": item }))
                .collect::<Vec<_>>(),
        }));
    }

    // Execution. AH first, then Picnic, exactly like the manual flow.
    let ah_result = if ah_batch.is_empty() {
        json!({ "ok": true, "added": 0 })
    } else {
        let report = ctx.ah.batch_add_order(&ah_batch).await;
        serde_json::to_value(&report)?
    };
    let ah_failed = ah_result
        .get("failed")
        .and_then(Value::as_array)
        .is_some_and(|failed| !failed.is_empty());

    let mut picnic_results = Vec::new();
    let mut picnic_failures = 0_usize;
    for entry in &picnic_batch {
        match ctx.picnic.add(&entry.id, entry.qty).await {
            Ok(response) => picnic_results.push(json!({
                "id": entry.id,
                "qty": entry.qty,
                "name": entry.name,
                "ok": true,
                "response": response,
            })),
            Err(e) => {
                warn!(id = %entry.id, error = %e, "picnic add failed");
                picnic_failures += 1;
                picnic_results.push(json!({
                    "id": entry.id,
                    "qty": entry.qty,
                    "name": entry.name,
                    "ok": false,
                    "error": e.to_string(),
                    "code": e.code(),
                }));
            }
        }
    }

    let result = json!({
        "dry_run": false,
        "auto_match": args.auto_match,
        "planned": planned,
        "skipped": skipped,
        "ah": ah_result,
        "picnic": picnic_results,
    });

    if ah_failed || picnic_failures > 0 {
        return Err(CliError::WithPayload {
            code: "partial_batch_failure",
            detail: format!(
                "some cart writes failed (ah failed: {ah_failed}, picnic failures: {picnic_failures}); applied items were not rolled back"
            ),
            payload: result,
        });
    }
    Ok(result)
}

/// `cart-both`: both cart snapshots, raw payloads included.
pub async fn cart_both(ctx: &BridgeContext<'_>) -> Result<Value, CliError> {
    let ah = ctx.ah.order().await?;
    let picnic_raw = ctx.picnic.cart().await?;
    let picnic = compare::picnic_snapshot(picnic_raw, ctx.config.picnic.price_unit)?;
    Ok(json!({ "ah": ah, "picnic": picnic }))
}

/// `compare-checkout`: normalize both totals and recommend the cheaper
/// store.
pub async fn compare_checkout(
    ctx: &BridgeContext<'_>,
    picnic_unit: Option<PicnicUnit>,
    include_carts: bool,
) -> Result<Value, CliError> {
    let unit = picnic_unit.unwrap_or(ctx.config.picnic.price_unit);

    let ah = ctx.ah.order().await?;
    let picnic_raw = ctx.picnic.cart().await?;
    let picnic = compare::picnic_snapshot(picnic_raw, unit)?;

    let report = compare::build_report(
        &ah,
        &picnic,
        CompareOptions {
            picnic_unit: unit,
            always_ah: ctx.config.always_ah,
            always_picnic: ctx.config.always_picnic,
        },
    );

    let mut output = json!({
        "report": report,
        "checkout_action": {
            "recommended_store": report.recommendation,
            "message": report.checkout_message(),
        },
    });

    if include_carts
        && let Some(obj) = output.as_object_mut()
    {
        obj.insert("carts".to_string(), json!({ "ah": ah, "picnic": picnic }));
    }

    Ok(output)
}

fn effective_settings(
    ctx: &BridgeContext<'_>,
    search_limit: Option<usize>,
) -> boodschap_bridge::MatchSettings {
    let mut settings = ctx.config.matching.clone();
    if let Some(limit) = search_limit {
        settings.search_limit = limit.max(1);
    }
    settings
}

/// Plan batches from explicit ids only; items with neither id are
/// skipped and reported.
fn plan_from_explicit_ids(
    items: &[boodschap_core::GroceryItem],
) -> (Vec<BatchEntry>, Vec<PicnicBatchEntry>, Vec<Value>) {
    let mut ah_raw = Vec::new();
    let mut picnic_raw: Vec<(PicnicProductId, u32, Option<String>)> = Vec::new();
    let mut skipped = Vec::new();

    for item in items {
        if item.ah_id.is_none() && item.picnic_id.is_none() {
            skipped.push(json!({
                "reason": "missing both ah_id and picnic_id",
                "item": item,
            }));
            continue;
        }
        if let Some(id) = item.ah_id {
            ah_raw.push((id, item.qty));
        }
        if let Some(id) = &item.picnic_id {
            picnic_raw.push((id.clone(), item.qty, item.name.clone()));
        }
    }

    (
        aggregate_ah_batch(&ah_raw),
        aggregate_picnic_batch(&picnic_raw),
        skipped,
    )
}
