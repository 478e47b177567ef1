//! Diff & apply for a single tenant.

use std::sync::Arc;

use futures_util::future::join_all;
use url::Url;

use crate::diff;
use crate::error::{GatewayError, ReconcileError};
use crate::graphql::WebhookApi;
use crate::log::ReconcileLog;
use crate::model::{
    ChangeRecord, ChangeStatus, Mode, ReconciliationResult, SkipReason, Tenant, WebhookChange,
};
use crate::traits::{ManifestProvider, TenantGateway};

/// Brings one tenant's registered webhooks in line with its manifests.
pub struct ReconcileEngine {
    provider: Arc<dyn ManifestProvider>,
    log: Arc<dyn ReconcileLog>,
}

impl ReconcileEngine {
    pub fn new(provider: Arc<dyn ManifestProvider>, log: Arc<dyn ReconcileLog>) -> Self {
        Self { provider, log }
    }

    /// Reconciles `tenant` through `gateway`.
    ///
    /// Never returns an error: every failure is folded into a `Failed`
    /// result. Nothing is retried here. In `DryRun` mode no mutation is sent.
    pub async fn reconcile(
        &self,
        tenant: &Tenant,
        gateway: &dyn TenantGateway,
        mode: Mode,
    ) -> ReconciliationResult {
        self.log.tenant_started(&tenant.api_origin, mode);
        let result = self.evaluate(tenant, gateway, mode).await;
        self.log.tenant_settled(&result);
        result
    }

    async fn evaluate(
        &self,
        tenant: &Tenant,
        gateway: &dyn TenantGateway,
        mode: Mode,
    ) -> ReconciliationResult {
        let origin = tenant.api_origin.clone();
        let api = WebhookApi::new(gateway);

        // 1. Fetch current state
        let details = match api.app_details().await {
            Ok(details) => details,
            Err(e) => {
                return ReconciliationResult::failed(origin, ReconcileError::TenantFetch(e), Vec::new());
            }
        };

        // 2. Tenants without webhooks are not fully provisioned yet
        if details.webhooks.is_empty() {
            return ReconciliationResult::skipped(origin, SkipReason::NoExistingWebhooks);
        }

        // 3. Callback base is the origin of the app URL
        let app_url = match details.app_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return ReconciliationResult::skipped(origin, SkipReason::NoCallbackUrl),
        };
        let callback_base = match callback_origin(app_url) {
            Ok(base) => base,
            Err(e) => return ReconciliationResult::failed(origin, e, Vec::new()),
        };

        // 4. All managed webhooks share one activation flag
        let enabled = details.webhooks.iter().any(|w| w.is_active);

        // 5. Desired state
        let mut manifests = match self
            .provider
            .manifests(&details.webhooks, &callback_base)
            .await
        {
            Ok(manifests) => manifests,
            Err(e) => return ReconciliationResult::failed(origin, e.into(), Vec::new()),
        };
        if manifests.is_empty() {
            return ReconciliationResult::skipped(origin, SkipReason::NoManifests);
        }
        for manifest in &mut manifests {
            manifest.is_active = enabled;
        }

        // 6. Diff
        let changes = match diff::plan(&details.webhooks, &manifests) {
            Ok(changes) => changes,
            Err(e) => return ReconciliationResult::failed(origin, e.into(), Vec::new()),
        };
        for change in &changes {
            self.log.change_planned(&origin, change);
        }

        match mode {
            // 7. Report only
            Mode::DryRun => {
                let records = changes.into_iter().map(ChangeRecord::planned).collect();
                ReconciliationResult::dry_run(origin, records)
            }
            // 8. Best-effort apply
            Mode::Apply => {
                let records = self.apply(&api, &origin, changes).await;
                let attempted = records.len();
                let failed = records.iter().filter(|r| r.is_failed()).count();
                if failed > 0 {
                    ReconciliationResult::failed(
                        origin,
                        ReconcileError::TenantApply { failed, attempted },
                        records,
                    )
                } else {
                    ReconciliationResult::applied(origin, records)
                }
            }
        }
    }

    /// Sends every change; a failing operation does not stop the others.
    async fn apply(
        &self,
        api: &WebhookApi<'_>,
        origin: &Url,
        changes: Vec<WebhookChange>,
    ) -> Vec<ChangeRecord> {
        let operations = changes.into_iter().map(|change| async move {
            let outcome = apply_change(api, &change).await;
            self.log.change_applied(origin, &change, outcome.as_ref().map(|_| ()));
            let status = match outcome {
                Ok(()) => ChangeStatus::Applied,
                Err(e) => ChangeStatus::Failed(e.to_string()),
            };
            ChangeRecord { change, status }
        });
        join_all(operations).await
    }
}

async fn apply_change(api: &WebhookApi<'_>, change: &WebhookChange) -> Result<(), GatewayError> {
    match change {
        WebhookChange::Create { manifest } => api.create(manifest).await.map(|_| ()),
        WebhookChange::Update { id, manifest, .. } => api.update(id, manifest).await,
        WebhookChange::Delete { id, .. } => api.delete(id).await,
    }
}

/// Reduces an app URL to its origin (scheme, host and port).
pub fn callback_origin(app_url: &str) -> Result<Url, ReconcileError> {
    let url = Url::parse(app_url)
        .map_err(|e| ReconcileError::invalid_callback_url(app_url, e.to_string()))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(ReconcileError::invalid_callback_url(
            app_url,
            "URL has no origin",
        ));
    }
    Url::parse(&origin.ascii_serialization())
        .map_err(|e| ReconcileError::invalid_callback_url(app_url, e.to_string()))
}
