//! Manifests built from the `[[webhooks]]` section of the configuration.

use async_trait::async_trait;
use hookfleet_core::{
    DesiredManifest, EventType, ManifestProvider, ProviderError, RegisteredWebhook, Secret,
};
use url::Url;

use crate::config::WebhookDefinition;

/// Produces the same webhook set for every tenant, pointed at the tenant's
/// callback origin.
pub struct StaticManifestProvider {
    definitions: Vec<WebhookDefinition>,
}

impl StaticManifestProvider {
    pub fn new(definitions: Vec<WebhookDefinition>) -> Self {
        Self { definitions }
    }
}

#[async_trait]
impl ManifestProvider for StaticManifestProvider {
    async fn manifests(
        &self,
        _current: &[RegisteredWebhook],
        callback_base: &Url,
    ) -> Result<Vec<DesiredManifest>, ProviderError> {
        self.definitions
            .iter()
            .map(|definition| manifest_for(definition, callback_base))
            .collect()
    }
}

fn manifest_for(
    definition: &WebhookDefinition,
    callback_base: &Url,
) -> Result<DesiredManifest, ProviderError> {
    let target = callback_base.join(&definition.path).map_err(|e| {
        ProviderError::new(format!(
            "cannot build target URL for {:?} from {:?}: {e}",
            definition.name, definition.path
        ))
    })?;

    let mut manifest = DesiredManifest::new(definition.name.clone(), target.to_string());
    for event in &definition.async_events {
        manifest = manifest.with_event(EventType::Async(event.clone()));
    }
    for event in &definition.sync_events {
        manifest = manifest.with_event(EventType::Sync(event.clone()));
    }
    if let Some(query) = definition.query.as_deref().filter(|q| !q.trim().is_empty()) {
        manifest = manifest.with_query(query);
    }
    if let Some(secret) = definition
        .secret
        .clone()
        .map(Secret::new)
        .filter(|s| !s.is_empty())
    {
        manifest = manifest.with_secret(secret);
    }
    Ok(manifest)
}
