//! Command implementations.
//!
//! Each command resolves its inputs, invokes exactly one client or
//! bridge operation, and returns the JSON value to print. Write
//! commands are not idempotent: repeated invocations add duplicate
//! line items.

pub mod auth;
pub mod both;
pub mod catalog;
pub mod list;
pub mod order;

use serde_json::json;

use boodschap_ah::BatchReport;
use boodschap_bridge::BridgeError;
use boodschap_core::Provider;

use crate::error::CliError;

/// Turn a batch report into a success value or a partial-failure error.
///
/// Applied items stay applied either way; a partial failure names every
/// failed id and carries the full report for reconciliation.
pub(crate) fn batch_outcome(
    report: BatchReport,
    provider: Provider,
) -> Result<serde_json::Value, CliError> {
    if report.all_applied() {
        return Ok(json!({
            "ok": true,
            "provider": provider,
            "applied": report.applied.len(),
            "report": report,
        }));
    }

    let detail = BridgeError::PartialBatchFailure {
        provider,
        failed: report.failed_ids(),
    }
    .to_string();

    Err(CliError::WithPayload {
        code: "partial_batch_failure",
        detail,
        payload: json!({
            "provider": provider,
            "report": report,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boodschap_ah::{BatchEntry, BatchFailure};
    use boodschap_core::ProductId;

    #[test]
    fn full_success_is_ok() {
        let report = BatchReport {
            applied: vec![BatchEntry {
                id: ProductId::new(1),
                qty: 2,
            }],
            failed: Vec::new(),
        };
        let value = batch_outcome(report, Provider::AlbertHeijn).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["applied"], 1);
    }

    #[test]
    fn mixed_result_is_a_partial_batch_failure_naming_the_id() {
        // Two valid items applied, one invalid id failed
        let report = BatchReport {
            applied: vec![
                BatchEntry {
                    id: ProductId::new(1),
                    qty: 1,
                },
                BatchEntry {
                    id: ProductId::new(2),
                    qty: 1,
                },
            ],
            failed: vec![BatchFailure {
                id: ProductId::new(999),
                qty: 1,
                code: "not_found",
                error: "not found: product 999".into(),
            }],
        };
        let err = batch_outcome(report, Provider::AlbertHeijn).unwrap_err();
        assert_eq!(err.code(), "partial_batch_failure");
        assert!(err.to_string().contains("999"));
        let payload = err.payload().unwrap();
        assert_eq!(payload["report"]["applied"].as_array().unwrap().len(), 2);
    }
}
