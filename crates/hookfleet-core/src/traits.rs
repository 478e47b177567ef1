//! Ports to the systems this crate talks to.
//!
//! The engine and runner depend only on these traits. HTTP implementations
//! live in `hookfleet-client`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::{GatewayError, ProviderError, RegistryError};
use crate::model::{DesiredManifest, RegisteredWebhook, Tenant};

/// Source of the tenant list for a run.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Lists every known tenant with its credential.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unavailable` if the backing store cannot be reached.
    async fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError>;

    /// Returns the name of this registry for logging.
    fn registry_name(&self) -> &'static str;
}

/// Authenticated GraphQL access to one tenant's API.
///
/// Both methods return the `data` object of the response.
#[async_trait]
pub trait TenantGateway: Send + Sync {
    async fn query(&self, document: &str, variables: Value) -> Result<Value, GatewayError>;

    async fn mutate(&self, document: &str, variables: Value) -> Result<Value, GatewayError>;
}

/// Builds a gateway bound to one tenant's origin and credential.
pub trait GatewayFactory: Send + Sync {
    fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn TenantGateway>, GatewayError>;
}

/// Produces the desired webhook manifests for a tenant.
///
/// Returning an empty list asks the engine to skip the tenant.
#[async_trait]
pub trait ManifestProvider: Send + Sync {
    async fn manifests(
        &self,
        current: &[RegisteredWebhook],
        callback_base: &Url,
    ) -> Result<Vec<DesiredManifest>, ProviderError>;
}

/// Adapts a plain function into a [`ManifestProvider`].
pub struct FnManifestProvider<F>(F);

impl<F> FnManifestProvider<F>
where
    F: Fn(&[RegisteredWebhook], &Url) -> Result<Vec<DesiredManifest>, ProviderError>
        + Send
        + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> ManifestProvider for FnManifestProvider<F>
where
    F: Fn(&[RegisteredWebhook], &Url) -> Result<Vec<DesiredManifest>, ProviderError>
        + Send
        + Sync,
{
    async fn manifests(
        &self,
        current: &[RegisteredWebhook],
        callback_base: &Url,
    ) -> Result<Vec<DesiredManifest>, ProviderError> {
        (self.0)(current, callback_base)
    }
}
