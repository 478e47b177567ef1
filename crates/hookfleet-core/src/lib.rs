//! # hookfleet-core
//!
//! Webhook manifest reconciliation for a fleet of tenant installations.
//!
//! ## Overview
//!
//! - [`FleetRunner`] lists tenants from a [`TenantRegistry`], connects a
//!   [`TenantGateway`] per tenant and reconciles all of them concurrently.
//!   One tenant failing never affects another.
//! - [`ReconcileEngine`] fetches a tenant's registered webhooks, asks the
//!   [`ManifestProvider`] for the desired set, diffs the two by name and
//!   applies the create/update/delete operations (or only reports them in
//!   [`Mode::DryRun`]).
//!
//! HTTP implementations of the registry and gateway live in
//! `hookfleet-client`.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hookfleet_core::prelude::*;
//!
//! async fn migrate(
//!     registry: Arc<dyn TenantRegistry>,
//!     gateways: Arc<dyn GatewayFactory>,
//!     provider: Arc<dyn ManifestProvider>,
//! ) -> Result<FleetReport, RegistryError> {
//!     let log: Arc<dyn ReconcileLog> = Arc::new(TracingLog);
//!     let engine = Arc::new(ReconcileEngine::new(provider, log.clone()));
//!     FleetRunner::new(registry, gateways, engine, log)
//!         .run(Mode::DryRun)
//!         .await
//! }
//! ```

pub mod diff;
pub mod engine;
mod error;
pub mod graphql;
pub mod log;
mod model;
pub mod report;
pub mod runner;
mod traits;

pub use engine::{ReconcileEngine, callback_origin};
pub use error::{
    ConfigurationError, ErrorCategory, GatewayError, ProviderError, ReconcileError, RegistryError,
};
pub use graphql::WebhookApi;
pub use log::{ReconcileLog, TracingLog};
pub use model::{
    AccessToken, AppDetails, ChangeOp, ChangeRecord, ChangeStatus, ChangedField, DesiredManifest,
    EventSet, EventType, Mode, Outcome, ReconciliationResult, RegisteredWebhook, Secret,
    SkipReason, Tenant, WebhookChange, WebhookId,
};
pub use report::{FleetReport, RunSummary};
pub use runner::FleetRunner;
pub use traits::{
    FnManifestProvider, GatewayFactory, ManifestProvider, TenantGateway, TenantRegistry,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use hookfleet_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::engine::ReconcileEngine;
    pub use crate::error::{GatewayError, ProviderError, ReconcileError, RegistryError};
    pub use crate::log::{ReconcileLog, TracingLog};
    pub use crate::model::{
        AccessToken, DesiredManifest, EventType, Mode, Outcome, ReconciliationResult,
        RegisteredWebhook, Secret, Tenant,
    };
    pub use crate::report::FleetReport;
    pub use crate::runner::FleetRunner;
    pub use crate::traits::{GatewayFactory, ManifestProvider, TenantGateway, TenantRegistry};
}
