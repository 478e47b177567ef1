//! Logging port for a reconciliation run.
//!
//! The engine and runner receive an `Arc<dyn ReconcileLog>` at construction.
//! [`TracingLog`] forwards every event to `tracing` with structured fields.

use url::Url;

use crate::error::GatewayError;
use crate::model::{Mode, Outcome, ReconciliationResult, WebhookChange};
use crate::report::FleetReport;

pub trait ReconcileLog: Send + Sync {
    fn run_started(&self, mode: Mode, tenants: usize);

    /// The registry listed the same origin more than once; only the first
    /// entry is reconciled.
    fn duplicate_tenant(&self, tenant: &Url);

    fn tenant_started(&self, tenant: &Url, mode: Mode);

    fn change_planned(&self, tenant: &Url, change: &WebhookChange);

    fn change_applied(&self, tenant: &Url, change: &WebhookChange, result: Result<(), &GatewayError>);

    fn tenant_settled(&self, result: &ReconciliationResult);

    fn run_finished(&self, report: &FleetReport);
}

/// Default [`ReconcileLog`] emitting `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ReconcileLog for TracingLog {
    fn run_started(&self, mode: Mode, tenants: usize) {
        tracing::info!(mode = %mode, tenants, "Starting webhook reconciliation");
    }

    fn duplicate_tenant(&self, tenant: &Url) {
        tracing::warn!(tenant = %tenant, "Tenant listed more than once, reconciling it once");
    }

    fn tenant_started(&self, tenant: &Url, mode: Mode) {
        tracing::info!(tenant = %tenant, mode = %mode, "Reconciling webhooks");
    }

    fn change_planned(&self, tenant: &Url, change: &WebhookChange) {
        tracing::info!(
            tenant = %tenant,
            op = %change.op(),
            webhook = change.name(),
            id = ?change.webhook_id(),
            "Planned webhook change"
        );
    }

    fn change_applied(&self, tenant: &Url, change: &WebhookChange, result: Result<(), &GatewayError>) {
        match result {
            Ok(()) => tracing::info!(
                tenant = %tenant,
                op = %change.op(),
                webhook = change.name(),
                "Webhook change applied"
            ),
            Err(error) => tracing::warn!(
                tenant = %tenant,
                op = %change.op(),
                webhook = change.name(),
                error = %error,
                "Webhook change failed"
            ),
        }
    }

    fn tenant_settled(&self, result: &ReconciliationResult) {
        let tenant = &result.api_origin;
        match (&result.outcome, &result.error) {
            (Outcome::Skipped(reason), _) => {
                tracing::warn!(tenant = %tenant, reason = %reason, "Tenant skipped");
            }
            (Outcome::Failed, Some(error)) => {
                tracing::error!(
                    tenant = %tenant,
                    category = %error.category(),
                    error = %error,
                    changes = result.changes.len(),
                    "Tenant reconciliation failed"
                );
            }
            (outcome, _) => {
                tracing::info!(
                    tenant = %tenant,
                    outcome = %outcome,
                    changes = result.changes.len(),
                    "Tenant reconciled"
                );
            }
        }
    }

    fn run_finished(&self, report: &FleetReport) {
        let summary = report.summary();
        tracing::info!(
            mode = %report.mode,
            tenants = summary.tenants,
            applied = summary.applied,
            dry_run = summary.dry_run,
            skipped = summary.skipped,
            failed = summary.failed,
            changes = summary.changes,
            "Webhook reconciliation complete"
        );
    }
}
