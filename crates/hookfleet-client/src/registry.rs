//! Tenant registries: the cloud installation list and a local TOML file.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use hookfleet_core::{RegistryError, Secret, Tenant, TenantRegistry};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Paginated installation list served by the app's cloud auth store.
pub struct CloudRegistry {
    http: reqwest::Client,
    endpoint: Url,
    token: Secret,
    page_size: usize,
}

#[derive(Deserialize)]
struct InstallationPage {
    #[serde(default)]
    results: Vec<Installation>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct Installation {
    saleor_api_url: String,
    token: String,
}

impl CloudRegistry {
    pub fn new(http: reqwest::Client, endpoint: Url, token: Secret) -> Self {
        Self {
            http,
            endpoint,
            token,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    async fn fetch_page(&self, url: &Url) -> Result<InstallationPage, RegistryError> {
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| RegistryError::unavailable(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::unavailable(format!(
                "GET {url} returned HTTP {status}: {body}"
            )));
        }

        resp.json::<InstallationPage>()
            .await
            .map_err(|e| RegistryError::invalid_response(format!("GET {url}: {e}")))
    }
}

#[async_trait]
impl TenantRegistry for CloudRegistry {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError> {
        let mut first = self.endpoint.clone();
        first
            .query_pairs_mut()
            .append_pair("limit", &self.page_size.to_string());

        let mut tenants = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(RegistryError::invalid_response(format!(
                    "pagination loops back to {url}"
                )));
            }

            let page = self.fetch_page(&url).await?;
            tenants.extend(
                page.results
                    .into_iter()
                    .filter_map(|i| tenant_from(&i.saleor_api_url, i.token)),
            );

            next = match page.next {
                Some(link) => Some(url.join(&link).map_err(|e| {
                    RegistryError::invalid_response(format!("invalid next link {link:?}: {e}"))
                })?),
                None => None,
            };
        }

        tracing::debug!(count = tenants.len(), "Fetched tenants from cloud registry");
        Ok(tenants)
    }

    fn registry_name(&self) -> &'static str {
        "cloud"
    }
}

/// Tenants listed in a local TOML file:
///
/// ```toml
/// [[tenants]]
/// api_url = "https://shop.example.com/graphql/"
/// token = "..."
/// ```
pub struct FileRegistry {
    path: PathBuf,
}

#[derive(Deserialize)]
struct TenantFile {
    #[serde(default)]
    tenants: Vec<TenantEntry>,
}

#[derive(Deserialize)]
struct TenantEntry {
    api_url: String,
    token: String,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TenantRegistry for FileRegistry {
    async fn list_tenants(&self) -> Result<Vec<Tenant>, RegistryError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RegistryError::unavailable(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        let file: TenantFile = toml::from_str(&content).map_err(|e| {
            RegistryError::invalid_response(format!("Failed to parse {}: {e}", self.path.display()))
        })?;

        Ok(file
            .tenants
            .into_iter()
            .filter_map(|entry| tenant_from(&entry.api_url, entry.token))
            .collect())
    }

    fn registry_name(&self) -> &'static str {
        "file"
    }
}

fn tenant_from(api_url: &str, token: String) -> Option<Tenant> {
    match Url::parse(api_url) {
        Ok(url) => Some(Tenant::new(url, Secret::new(token))),
        Err(e) => {
            tracing::warn!(api_url, error = %e, "Skipping tenant with invalid API URL");
            None
        }
    }
}
