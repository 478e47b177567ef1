//! GraphQL gateway over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hookfleet_core::{AccessToken, GatewayError, GatewayFactory, Tenant, TenantGateway};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

const MAX_ERROR_BODY: usize = 512;

/// HTTP settings shared by every tenant gateway.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("hookfleet/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Builds [`HttpGateway`]s that share one connection pool.
pub struct HttpGatewayFactory {
    http: reqwest::Client,
}

impl HttpGatewayFactory {
    pub fn new(settings: &GatewaySettings) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| GatewayError::transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

impl GatewayFactory for HttpGatewayFactory {
    fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn TenantGateway>, GatewayError> {
        Ok(Arc::new(HttpGateway::new(
            self.http.clone(),
            tenant.api_origin.clone(),
            tenant.access_token.clone(),
        )))
    }
}

/// Sends GraphQL documents to one tenant's API with its bearer token.
pub struct HttpGateway {
    http: reqwest::Client,
    endpoint: Url,
    token: AccessToken,
}

impl HttpGateway {
    pub fn new(http: reqwest::Client, endpoint: Url, token: AccessToken) -> Self {
        Self {
            http,
            endpoint,
            token,
        }
    }

    async fn execute(&self, document: &str, variables: Value) -> Result<Value, GatewayError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(self.token.expose())
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;
        handle_response(resp).await
    }
}

#[async_trait]
impl TenantGateway for HttpGateway {
    async fn query(&self, document: &str, variables: Value) -> Result<Value, GatewayError> {
        self.execute(document, variables).await
    }

    async fn mutate(&self, document: &str, variables: Value) -> Result<Value, GatewayError> {
        self.execute(document, variables).await
    }
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorNode>,
}

#[derive(Deserialize)]
struct GraphqlErrorNode {
    message: String,
}

async fn handle_response(resp: reqwest::Response) -> Result<Value, GatewayError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| GatewayError::transport(e.to_string()))?;

    if !status.is_success() {
        return Err(GatewayError::status(status.as_u16(), truncate(&body)));
    }

    let response: GraphqlResponse = serde_json::from_str(&body)
        .map_err(|e| GatewayError::decode(format!("Failed to parse GraphQL response: {e}")))?;

    if !response.errors.is_empty() {
        return Err(GatewayError::graphql(
            response.errors.into_iter().map(|e| e.message).collect(),
        ));
    }

    match response.data {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(GatewayError::decode("GraphQL response has no data")),
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut short: String = body.chars().take(MAX_ERROR_BODY).collect();
    short.push('…');
    short
}
