//! Typed webhook operations over a [`TenantGateway`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::GatewayError;
use crate::model::{AppDetails, DesiredManifest, EventSet, EventType, RegisteredWebhook, WebhookId};
use crate::traits::TenantGateway;

pub const APP_DETAILS_QUERY: &str = r#"query AppDetails {
  app {
    id
    appUrl
    webhooks {
      id
      name
      isActive
      targetUrl
      secretKey
      subscriptionQuery
      asyncEvents { eventType }
      syncEvents { eventType }
    }
  }
}"#;

pub const WEBHOOK_CREATE_MUTATION: &str = r#"mutation WebhookCreate($input: WebhookCreateInput!) {
  webhookCreate(input: $input) {
    errors { field message code }
    webhook { id }
  }
}"#;

pub const WEBHOOK_UPDATE_MUTATION: &str = r#"mutation WebhookUpdate($id: ID!, $input: WebhookUpdateInput!) {
  webhookUpdate(id: $id, input: $input) {
    errors { field message code }
    webhook { id }
  }
}"#;

pub const WEBHOOK_DELETE_MUTATION: &str = r#"mutation WebhookDelete($id: ID!) {
  webhookDelete(id: $id) {
    errors { field message code }
  }
}"#;

#[derive(Deserialize)]
struct AppDetailsData {
    app: Option<AppNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppNode {
    app_url: Option<String>,
    webhooks: Option<Vec<WebhookNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookNode {
    id: String,
    name: Option<String>,
    is_active: bool,
    target_url: Option<String>,
    secret_key: Option<String>,
    subscription_query: Option<String>,
    async_events: Option<Vec<EventNode>>,
    sync_events: Option<Vec<EventNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventNode {
    event_type: String,
}

#[derive(Deserialize)]
struct MutationPayload {
    #[serde(default)]
    errors: Vec<MutationErrorNode>,
    webhook: Option<IdNode>,
}

#[derive(Deserialize)]
struct MutationErrorNode {
    field: Option<String>,
    message: Option<String>,
    code: Option<String>,
}

#[derive(Deserialize)]
struct IdNode {
    id: String,
}

impl From<WebhookNode> for RegisteredWebhook {
    fn from(node: WebhookNode) -> Self {
        let mut subscribed_events = EventSet::new();
        for event in node.async_events.unwrap_or_default() {
            subscribed_events.insert(EventType::Async(event.event_type));
        }
        for event in node.sync_events.unwrap_or_default() {
            subscribed_events.insert(EventType::Sync(event.event_type));
        }

        RegisteredWebhook {
            id: WebhookId::new(node.id),
            name: node.name.unwrap_or_default(),
            target_url: node.target_url.unwrap_or_default(),
            subscribed_events,
            is_active: node.is_active,
            secret_present: node.secret_key.is_some_and(|s| !s.is_empty()),
            query: node.subscription_query.filter(|q| !q.trim().is_empty()),
        }
    }
}

impl MutationErrorNode {
    fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or("unknown error");
        match (&self.field, &self.code) {
            (Some(field), Some(code)) => format!("{field}: {message} ({code})"),
            (Some(field), None) => format!("{field}: {message}"),
            (None, Some(code)) => format!("{message} ({code})"),
            (None, None) => message.to_string(),
        }
    }
}

/// Webhook queries and mutations for one tenant.
pub struct WebhookApi<'a> {
    gateway: &'a dyn TenantGateway,
}

impl<'a> WebhookApi<'a> {
    pub fn new(gateway: &'a dyn TenantGateway) -> Self {
        Self { gateway }
    }

    /// Fetches the app URL and registered webhooks.
    pub async fn app_details(&self) -> Result<AppDetails, GatewayError> {
        let data = self.gateway.query(APP_DETAILS_QUERY, json!({})).await?;
        let data: AppDetailsData = decode(data)?;
        let app = data.app.ok_or(GatewayError::AppNotFound)?;

        Ok(AppDetails {
            app_url: app.app_url,
            webhooks: app
                .webhooks
                .unwrap_or_default()
                .into_iter()
                .map(RegisteredWebhook::from)
                .collect(),
        })
    }

    pub async fn create(&self, manifest: &DesiredManifest) -> Result<WebhookId, GatewayError> {
        let variables = json!({ "input": manifest_input(manifest) });
        let data = self
            .gateway
            .mutate(WEBHOOK_CREATE_MUTATION, variables)
            .await?;
        let payload = mutation_payload(data, "webhookCreate")?;
        payload
            .webhook
            .map(|w| WebhookId::new(w.id))
            .ok_or_else(|| GatewayError::decode("webhookCreate returned no webhook"))
    }

    pub async fn update(
        &self,
        id: &WebhookId,
        manifest: &DesiredManifest,
    ) -> Result<(), GatewayError> {
        let variables = json!({ "id": id.as_str(), "input": manifest_input(manifest) });
        let data = self
            .gateway
            .mutate(WEBHOOK_UPDATE_MUTATION, variables)
            .await?;
        mutation_payload(data, "webhookUpdate")?;
        Ok(())
    }

    pub async fn delete(&self, id: &WebhookId) -> Result<(), GatewayError> {
        let data = self
            .gateway
            .mutate(WEBHOOK_DELETE_MUTATION, json!({ "id": id.as_str() }))
            .await?;
        mutation_payload(data, "webhookDelete")?;
        Ok(())
    }
}

/// Builds the create/update input. The query and secret are only sent when
/// the manifest sets them; the remote keeps its value for omitted fields.
fn manifest_input(manifest: &DesiredManifest) -> Value {
    let (sync, asynchronous): (Vec<&EventType>, Vec<&EventType>) = manifest
        .subscribed_events
        .iter()
        .partition(|event| event.is_sync());

    let mut input = Map::new();
    input.insert("name".into(), json!(manifest.name));
    input.insert("targetUrl".into(), json!(manifest.target_url));
    input.insert("isActive".into(), json!(manifest.is_active));
    input.insert(
        "asyncEvents".into(),
        json!(asynchronous.iter().map(|e| e.name()).collect::<Vec<_>>()),
    );
    input.insert(
        "syncEvents".into(),
        json!(sync.iter().map(|e| e.name()).collect::<Vec<_>>()),
    );
    if let Some(query) = &manifest.query {
        input.insert("query".into(), json!(query));
    }
    if let Some(secret) = &manifest.secret {
        input.insert("secretKey".into(), json!(secret.expose()));
    }
    Value::Object(input)
}

fn mutation_payload(mut data: Value, operation: &str) -> Result<MutationPayload, GatewayError> {
    let payload = data
        .get_mut(operation)
        .map(Value::take)
        .filter(|v| !v.is_null())
        .ok_or_else(|| GatewayError::decode(format!("missing {operation} payload")))?;
    let payload: MutationPayload = decode(payload)?;

    if !payload.errors.is_empty() {
        let messages = payload.errors.iter().map(MutationErrorNode::describe).collect();
        return Err(GatewayError::mutation(operation, messages));
    }
    Ok(payload)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::decode(e.to_string()))
}
