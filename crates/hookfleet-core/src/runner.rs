//! Fleet runner: reconciles every tenant from the registry concurrently.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::engine::ReconcileEngine;
use crate::error::{ReconcileError, RegistryError};
use crate::log::ReconcileLog;
use crate::model::{Mode, ReconciliationResult, Tenant};
use crate::report::FleetReport;
use crate::traits::{GatewayFactory, TenantRegistry};

pub struct FleetRunner {
    registry: Arc<dyn TenantRegistry>,
    gateways: Arc<dyn GatewayFactory>,
    engine: Arc<ReconcileEngine>,
    log: Arc<dyn ReconcileLog>,
    max_concurrency: Option<usize>,
}

impl FleetRunner {
    pub fn new(
        registry: Arc<dyn TenantRegistry>,
        gateways: Arc<dyn GatewayFactory>,
        engine: Arc<ReconcileEngine>,
        log: Arc<dyn ReconcileLog>,
    ) -> Self {
        Self {
            registry,
            gateways,
            engine,
            log,
            max_concurrency: None,
        }
    }

    /// Caps how many tenants are reconciled at the same time.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }

    /// Reconciles every tenant and returns once all of them have settled.
    ///
    /// # Errors
    ///
    /// Only a failure to list tenants is returned. Per-tenant failures,
    /// panics included, become `Failed` entries in the report.
    pub async fn run(&self, mode: Mode) -> Result<FleetReport, RegistryError> {
        let tenants = match self.registry.list_tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                tracing::error!(
                    registry = self.registry.registry_name(),
                    error = %e,
                    "Could not fetch tenants from the registry"
                );
                return Err(e);
            }
        };
        let tenants = self.dedupe(tenants);
        self.log.run_started(mode, tenants.len());

        let limiter = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();
        let mut origins = HashMap::with_capacity(tenants.len());

        for tenant in tenants {
            let origin = tenant.api_origin.clone();
            let engine = Arc::clone(&self.engine);
            let gateways = Arc::clone(&self.gateways);
            let log = Arc::clone(&self.log);
            let limiter = limiter.clone();

            let handle = tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                reconcile_tenant(&engine, gateways.as_ref(), log.as_ref(), &tenant, mode).await
            });
            origins.insert(handle.id(), origin);
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let result = match joined {
                Ok((_, result)) => result,
                Err(err) => {
                    let Some(origin) = origins.remove(&err.id()) else {
                        tracing::error!(error = %err, "Reconciliation task for unknown tenant failed");
                        continue;
                    };
                    let message = if err.is_panic() {
                        panic_message(err.into_panic())
                    } else {
                        err.to_string()
                    };
                    let result = ReconciliationResult::failed(
                        origin,
                        ReconcileError::panicked(message),
                        Vec::new(),
                    );
                    self.log.tenant_settled(&result);
                    result
                }
            };
            results.insert(result.api_origin.clone(), result);
        }

        let report = FleetReport::new(mode, results);
        self.log.run_finished(&report);
        Ok(report)
    }

    /// Keeps the first entry per origin; the report is keyed by origin.
    fn dedupe(&self, tenants: Vec<Tenant>) -> Vec<Tenant> {
        let mut seen = HashSet::with_capacity(tenants.len());
        tenants
            .into_iter()
            .filter(|tenant| {
                let first = seen.insert(tenant.api_origin.clone());
                if !first {
                    self.log.duplicate_tenant(&tenant.api_origin);
                }
                first
            })
            .collect()
    }
}

async fn reconcile_tenant(
    engine: &ReconcileEngine,
    gateways: &dyn GatewayFactory,
    log: &dyn ReconcileLog,
    tenant: &Tenant,
    mode: Mode,
) -> ReconciliationResult {
    match gateways.connect(tenant) {
        Ok(gateway) => engine.reconcile(tenant, gateway.as_ref(), mode).await,
        Err(e) => {
            let result = ReconciliationResult::failed(
                tenant.api_origin.clone(),
                ReconcileError::TenantFetch(e),
                Vec::new(),
            );
            log.tenant_settled(&result);
            result
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
