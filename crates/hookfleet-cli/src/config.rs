use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "hookfleet.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Webhooks every tenant should have
    #[serde(default)]
    pub webhooks: Vec<WebhookDefinition>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Registry validations
        if self.registry.page_size == 0 {
            return Err("registry.page_size must be > 0".into());
        }
        match self.registry.kind {
            RegistryKind::Cloud => {
                if let Some(endpoint) = non_empty(self.registry.endpoint.as_deref()) {
                    Url::parse(endpoint)
                        .map_err(|e| format!("registry.endpoint is not a valid URL: {e}"))?;
                }
            }
            RegistryKind::File => {
                if self.registry.path.is_none() {
                    return Err("registry.kind = \"file\" requires registry.path".into());
                }
            }
        }
        // Gateway validations
        if self.gateway.request_timeout_ms == 0 {
            return Err("gateway.request_timeout_ms must be > 0".into());
        }
        if self.gateway.user_agent.trim().is_empty() {
            return Err("gateway.user_agent must not be empty".into());
        }
        // Runner validation
        if self.runner.max_concurrency == Some(0) {
            return Err("runner.max_concurrency must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Webhook definitions
        if self.webhooks.is_empty() {
            return Err("at least one [[webhooks]] definition is required".into());
        }
        let mut names = HashSet::new();
        for webhook in &self.webhooks {
            if webhook.name.trim().is_empty() {
                return Err("webhooks.name must not be empty".into());
            }
            if webhook.path.trim().is_empty() {
                return Err(format!("webhook {:?} has an empty path", webhook.name));
            }
            if webhook.async_events.is_empty() && webhook.sync_events.is_empty() {
                return Err(format!("webhook {:?} subscribes to no events", webhook.name));
            }
            if !names.insert(webhook.name.as_str()) {
                return Err(format!("duplicate webhook name {:?}", webhook.name));
            }
        }
        Ok(())
    }

    /// Checks that the selected registry has what it needs to authenticate.
    pub fn check_credentials(&self) -> Result<(), String> {
        match self.registry.kind {
            RegistryKind::Cloud => {
                let endpoint = non_empty(self.registry.endpoint.as_deref());
                let token = non_empty(self.registry.token.as_deref());
                if endpoint.is_none() || token.is_none() {
                    return Err(
                        "registry.endpoint and registry.token must be set for the cloud registry \
                         (HOOKFLEET__REGISTRY__ENDPOINT, HOOKFLEET__REGISTRY__TOKEN)"
                            .into(),
                    );
                }
                Ok(())
            }
            RegistryKind::File => Ok(()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    #[default]
    Cloud,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub kind: RegistryKind,
    /// Installation list URL of the cloud registry
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Tenant file of the file registry
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    hookfleet_client::DEFAULT_PAGE_SIZE
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: RegistryKind::default(),
            endpoint: None,
            token: None,
            path: None,
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    concat!("hookfleet/", env!("CARGO_PKG_VERSION")).into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// Unbounded when unset
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// One webhook the app expects on every tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDefinition {
    pub name: String,
    /// Path joined onto the tenant's callback origin
    pub path: String,
    #[serde(default)]
    pub async_events: Vec<String>,
    #[serde(default)]
    pub sync_events: Vec<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

pub mod loader {
    use super::{AppConfig, DEFAULT_CONFIG_PATH};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Loads `path` (or `hookfleet.toml` when present) and applies
    /// `HOOKFLEET__SECTION__KEY` environment overrides.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., HOOKFLEET__REGISTRY__TOKEN=...
        builder = builder.add_source(
            Environment::with_prefix("HOOKFLEET")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
