//! In-memory tenants, registry and log for engine and runner tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hookfleet_core::{
    DesiredManifest, EventType, FleetReport, FnManifestProvider, GatewayError, GatewayFactory,
    ManifestProvider, Mode, ProviderError, ReconcileLog, ReconciliationResult, RegisteredWebhook,
    RegistryError, Secret, Tenant, TenantGateway, TenantRegistry, WebhookChange,
};
use serde_json::{Value, json};
use url::Url;

pub const APP_URL: &str = "https://app.example.com/configuration";

pub fn origin(host: &str) -> Url {
    Url::parse(&format!("https://{host}/graphql/")).unwrap()
}

pub fn tenant(host: &str) -> Tenant {
    Tenant::new(origin(host), Secret::new(format!("token-{host}")))
}

pub fn webhook_url(name: &str) -> String {
    format!(
        "https://app.example.com/api/webhooks/{}",
        name.to_lowercase().replace(' ', "-")
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredHook {
    pub id: String,
    pub name: String,
    pub target_url: String,
    pub is_active: bool,
    pub secret: Option<String>,
    pub query: Option<String>,
    pub async_events: Vec<String>,
    pub sync_events: Vec<String>,
}

#[derive(Default)]
struct FakeState {
    app_url: Option<String>,
    hooks: Vec<StoredHook>,
    next_id: usize,
}

/// A tenant API that keeps webhooks in memory and answers the webhook
/// GraphQL documents.
#[derive(Default)]
pub struct FakeTenant {
    state: Mutex<FakeState>,
    fail_fetch: bool,
    failing: HashSet<(String, String)>,
    pub queries: AtomicUsize,
    pub mutations: AtomicUsize,
}

impl FakeTenant {
    pub fn new() -> Self {
        Self::default().with_app_url(APP_URL)
    }

    pub fn with_app_url(self, url: &str) -> Self {
        self.state.lock().unwrap().app_url = Some(url.to_string());
        self
    }

    pub fn without_app_url(self) -> Self {
        self.state.lock().unwrap().app_url = None;
        self
    }

    pub fn with_hook(self, name: &str, events: &[&str], active: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("hook-{}", state.next_id);
            state.hooks.push(StoredHook {
                id,
                name: name.to_string(),
                target_url: webhook_url(name),
                is_active: active,
                secret: None,
                query: None,
                async_events: events.iter().map(|e| e.to_string()).collect(),
                sync_events: Vec::new(),
            });
        }
        self
    }

    /// Sets the subscription query of an already registered webhook.
    pub fn with_query(self, name: &str, query: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for hook in state.hooks.iter_mut().filter(|h| h.name == name) {
                hook.query = Some(query.to_string());
            }
        }
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Makes `op` ("create", "update" or "delete") fail for webhook `name`.
    pub fn failing(mut self, op: &str, name: &str) -> Self {
        self.failing.insert((op.to_string(), name.to_string()));
        self
    }

    pub fn hooks(&self) -> Vec<StoredHook> {
        self.state.lock().unwrap().hooks.clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn rejects(&self, op: &str, name: &str) -> bool {
        self.failing.contains(&(op.to_string(), name.to_string()))
    }

    fn app_json(&self) -> Value {
        let state = self.state.lock().unwrap();
        let hooks: Vec<Value> = state
            .hooks
            .iter()
            .map(|h| {
                json!({
                    "id": h.id,
                    "name": h.name,
                    "isActive": h.is_active,
                    "targetUrl": h.target_url,
                    "secretKey": h.secret,
                    "subscriptionQuery": h.query,
                    "asyncEvents": h.async_events.iter().map(|e| json!({ "eventType": e })).collect::<Vec<_>>(),
                    "syncEvents": h.sync_events.iter().map(|e| json!({ "eventType": e })).collect::<Vec<_>>(),
                })
            })
            .collect();
        json!({ "app": { "id": "app-1", "appUrl": state.app_url, "webhooks": hooks } })
    }
}

fn rejected(operation: &str) -> Value {
    json!({
        operation: {
            "errors": [{ "field": null, "message": "rejected by test", "code": "INVALID" }],
            "webhook": null
        }
    })
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn apply_input(hook: &mut StoredHook, input: &Value) {
    if let Some(name) = input["name"].as_str() {
        hook.name = name.to_string();
    }
    if let Some(target_url) = input["targetUrl"].as_str() {
        hook.target_url = target_url.to_string();
    }
    if let Some(is_active) = input["isActive"].as_bool() {
        hook.is_active = is_active;
    }
    if input.get("asyncEvents").is_some() {
        hook.async_events = strings(&input["asyncEvents"]);
    }
    if input.get("syncEvents").is_some() {
        hook.sync_events = strings(&input["syncEvents"]);
    }
    if let Some(query) = input["query"].as_str() {
        hook.query = Some(query.to_string());
    }
    if let Some(secret) = input["secretKey"].as_str() {
        hook.secret = Some(secret.to_string());
    }
}

#[async_trait]
impl TenantGateway for FakeTenant {
    async fn query(&self, _document: &str, _variables: Value) -> Result<Value, GatewayError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(GatewayError::status(401, "Invalid token"));
        }
        Ok(self.app_json())
    }

    async fn mutate(&self, document: &str, variables: Value) -> Result<Value, GatewayError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);

        if document.contains("webhookCreate(") {
            let input = &variables["input"];
            let name = input["name"].as_str().unwrap_or_default();
            if self.rejects("create", name) {
                return Ok(rejected("webhookCreate"));
            }
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let mut hook = StoredHook {
                id: format!("hook-{}", state.next_id),
                name: String::new(),
                target_url: String::new(),
                is_active: false,
                secret: None,
                query: None,
                async_events: Vec::new(),
                sync_events: Vec::new(),
            };
            apply_input(&mut hook, input);
            let id = hook.id.clone();
            state.hooks.push(hook);
            return Ok(json!({ "webhookCreate": { "errors": [], "webhook": { "id": id } } }));
        }

        let id = variables["id"].as_str().unwrap_or_default().to_string();
        let mut state = self.state.lock().unwrap();
        let Some(position) = state.hooks.iter().position(|h| h.id == id) else {
            return Err(GatewayError::graphql(vec![format!("Couldn't resolve id: {id}")]));
        };
        let name = state.hooks[position].name.clone();

        if document.contains("webhookUpdate(") {
            if self.rejects("update", &name) {
                return Ok(rejected("webhookUpdate"));
            }
            apply_input(&mut state.hooks[position], &variables["input"]);
            Ok(json!({ "webhookUpdate": { "errors": [], "webhook": { "id": id } } }))
        } else if document.contains("webhookDelete(") {
            if self.rejects("delete", &name) {
                return Err(GatewayError::transport("connection reset"));
            }
            state.hooks.remove(position);
            Ok(json!({ "webhookDelete": { "errors": [] } }))
        } else {
            Err(GatewayError::graphql(vec!["unknown mutation".to_string()]))
        }
    }
}

/// Hands out the fake tenant registered for an origin.
#[derive(Default)]
pub struct FakeGateways {
    tenants: HashMap<Url, Arc<FakeTenant>>,
}

impl FakeGateways {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, host: &str, tenant: Arc<FakeTenant>) -> Self {
        self.tenants.insert(origin(host), tenant);
        self
    }
}

impl GatewayFactory for FakeGateways {
    fn connect(&self, tenant: &Tenant) -> Result<Arc<dyn TenantGateway>, GatewayError> {
        self.tenants
            .get(&tenant.api_origin)
            .map(|t| Arc::clone(t) as Arc<dyn TenantGateway>)
            .ok_or_else(|| GatewayError::transport(format!("no route to {}", tenant.api_origin)))
    }
}

pub struct FakeRegistry {
    tenants: Result<Vec<Tenant>, RegistryError>,
}

impl FakeRegistry {
    pub fn new(hosts: &[&str]) -> Self {
        Self {
            tenants: Ok(hosts.iter().map(|h| tenant(h)).collect()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            tenants: Err(RegistryError::unavailable("connection refused")),
        }
    }
}

#[async_trait]
impl TenantRegistry for FakeRegistry {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError> {
        self.tenants.clone()
    }

    fn registry_name(&self) -> &'static str {
        "fake"
    }
}

/// Records log events as short strings.
#[derive(Default)]
pub struct RecordingLog {
    events: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ReconcileLog for RecordingLog {
    fn run_started(&self, mode: Mode, tenants: usize) {
        self.push(format!("run_started {mode} {tenants}"));
    }

    fn duplicate_tenant(&self, tenant: &Url) {
        self.push(format!("duplicate {tenant}"));
    }

    fn tenant_started(&self, tenant: &Url, mode: Mode) {
        self.push(format!("tenant_started {tenant} {mode}"));
    }

    fn change_planned(&self, tenant: &Url, change: &WebhookChange) {
        self.push(format!("planned {tenant} {change}"));
    }

    fn change_applied(
        &self,
        tenant: &Url,
        change: &WebhookChange,
        result: Result<(), &GatewayError>,
    ) {
        let status = if result.is_ok() { "ok" } else { "err" };
        self.push(format!("applied {tenant} {change} {status}"));
    }

    fn tenant_settled(&self, result: &ReconciliationResult) {
        self.push(format!("settled {} {}", result.api_origin, result.outcome));
    }

    fn run_finished(&self, report: &FleetReport) {
        self.push(format!("run_finished {}", report.len()));
    }
}

/// Desired webhooks of the test application: `(name, events)`.
pub fn catalog(definitions: &[(&str, &[&str])]) -> Arc<dyn ManifestProvider> {
    let definitions: Vec<(String, Vec<String>)> = definitions
        .iter()
        .map(|(name, events)| {
            (
                name.to_string(),
                events.iter().map(|e| e.to_string()).collect(),
            )
        })
        .collect();

    Arc::new(FnManifestProvider::new(
        move |_current: &[RegisteredWebhook], base: &Url| {
            definitions
                .iter()
                .map(|(name, events)| {
                    let path = format!("api/webhooks/{}", name.to_lowercase().replace(' ', "-"));
                    let target = base.join(&path).map_err(|e| ProviderError::new(e.to_string()))?;
                    let mut manifest = DesiredManifest::new(name.clone(), target.to_string());
                    for event in events {
                        manifest = manifest.with_event(EventType::Async(event.clone()));
                    }
                    Ok(manifest)
                })
                .collect()
        },
    ))
}
