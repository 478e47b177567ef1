//! Manifest diff: registered webhooks vs desired manifests, matched by name.

use std::collections::{HashMap, HashSet};

use crate::error::ConfigurationError;
use crate::model::{ChangedField, DesiredManifest, RegisteredWebhook, WebhookChange};

/// Computes the operations that turn `current` into `desired`.
///
/// - desired but not registered: `Create`
/// - registered and desired with differing fields: `Update` on the existing id
/// - registered but not desired: `Delete`
///
/// Changes come in desired order (creates and updates) followed by
/// registered order (deletes). When the tenant holds several webhooks with
/// the same name, the first one is matched and the rest are deleted.
///
/// # Errors
///
/// Returns `ConfigurationError::DuplicateManifestName` if two desired
/// manifests share a name.
pub fn plan(
    current: &[RegisteredWebhook],
    desired: &[DesiredManifest],
) -> Result<Vec<WebhookChange>, ConfigurationError> {
    let mut desired_names: HashSet<&str> = HashSet::with_capacity(desired.len());
    for manifest in desired {
        if !desired_names.insert(manifest.match_key()) {
            return Err(ConfigurationError::DuplicateManifestName {
                name: manifest.name.clone(),
            });
        }
    }

    let mut current_map: HashMap<&str, &RegisteredWebhook> = HashMap::new();
    for hook in current {
        current_map.entry(hook.name.as_str()).or_insert(hook);
    }

    let mut changes = Vec::new();

    for manifest in desired {
        match current_map.get(manifest.match_key()) {
            None => changes.push(WebhookChange::Create {
                manifest: manifest.clone(),
            }),
            Some(existing) => {
                let fields = changed_fields(existing, manifest);
                if !fields.is_empty() {
                    changes.push(WebhookChange::Update {
                        id: existing.id.clone(),
                        manifest: manifest.clone(),
                        fields,
                    });
                }
            }
        }
    }

    for hook in current {
        let matched = desired_names.contains(hook.name.as_str())
            && current_map
                .get(hook.name.as_str())
                .is_some_and(|first| first.id == hook.id);
        if !matched {
            changes.push(WebhookChange::Delete {
                id: hook.id.clone(),
                name: hook.name.clone(),
            });
        }
    }

    Ok(changes)
}

/// Lists the fields of `current` that differ from `desired`.
///
/// Secrets are write-only on the remote side, so only a missing secret that
/// the manifest wants set counts as a difference. A manifest without a
/// subscription query leaves the registered query unmanaged, since update
/// inputs that omit a field keep its remote value.
pub fn changed_fields(current: &RegisteredWebhook, desired: &DesiredManifest) -> Vec<ChangedField> {
    let mut fields = Vec::new();

    if current.target_url != desired.target_url {
        fields.push(ChangedField::TargetUrl);
    }
    if current.subscribed_events != desired.subscribed_events {
        fields.push(ChangedField::Events);
    }
    if current.is_active != desired.is_active {
        fields.push(ChangedField::Active);
    }
    if let Some(wanted) = normalized_query(desired.query.as_deref()) {
        if normalized_query(current.query.as_deref()) != Some(wanted) {
            fields.push(ChangedField::Query);
        }
    }
    if desired.secret.is_some() && !current.secret_present {
        fields.push(ChangedField::Secret);
    }

    fields
}

fn normalized_query(query: Option<&str>) -> Option<&str> {
    query.map(str::trim).filter(|q| !q.is_empty())
}
