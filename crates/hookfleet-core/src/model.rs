//! Data model for tenants, observed webhooks, desired manifests and results.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::error::ReconcileError;

/// A credential or signing secret. Formatting never reveals the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw value. Only call this at the point of use.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Access token of one tenant installation.
pub type AccessToken = Secret;

/// One installation of the application, identified by its API URL.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub api_origin: Url,
    pub access_token: AccessToken,
}

impl Tenant {
    pub fn new(api_origin: Url, access_token: AccessToken) -> Self {
        Self {
            api_origin,
            access_token,
        }
    }
}

/// Remote identity of a registered webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebhookId(String);

impl WebhookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WebhookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event a webhook is subscribed to.
///
/// The platform keeps asynchronous and synchronous subscriptions apart, so
/// the same event name can appear once in each flavour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "event", rename_all = "lowercase")]
pub enum EventType {
    Async(String),
    Sync(String),
}

impl EventType {
    pub fn name(&self) -> &str {
        match self {
            Self::Async(name) | Self::Sync(name) => name,
        }
    }

    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Sync(_))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async(name) => f.write_str(name),
            Self::Sync(name) => write!(f, "{name} (sync)"),
        }
    }
}

/// Order-insensitive set of subscribed events.
pub type EventSet = BTreeSet<EventType>;

/// A webhook as currently registered in a tenant's API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredWebhook {
    pub id: WebhookId,
    pub name: String,
    pub target_url: String,
    pub subscribed_events: EventSet,
    pub is_active: bool,
    pub secret_present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// A webhook as it should be registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredManifest {
    pub name: String,
    pub target_url: String,
    pub subscribed_events: EventSet,
    pub is_active: bool,
    #[serde(skip)]
    pub secret: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl DesiredManifest {
    pub fn new(name: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_url: target_url.into(),
            subscribed_events: EventSet::new(),
            is_active: true,
            secret: None,
            query: None,
        }
    }

    pub fn with_event(mut self, event: EventType) -> Self {
        self.subscribed_events.insert(event);
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Key used to correlate this manifest with a registered webhook.
    pub fn match_key(&self) -> &str {
        &self.name
    }
}

/// App installation details fetched from a tenant.
#[derive(Debug, Clone, Default)]
pub struct AppDetails {
    /// Configured app URL; the callback base is derived from its origin.
    pub app_url: Option<String>,
    pub webhooks: Vec<RegisteredWebhook>,
}

/// Whether changes are applied or only computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Apply,
    DryRun,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::DryRun => write!(f, "dry-run"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Field that differs between a registered webhook and its manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    TargetUrl,
    Events,
    Active,
    Query,
    Secret,
}

/// One operation needed to bring a tenant in line with its manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WebhookChange {
    Create {
        manifest: DesiredManifest,
    },
    /// Full replace of mutable fields; the remote id is kept.
    Update {
        id: WebhookId,
        manifest: DesiredManifest,
        fields: Vec<ChangedField>,
    },
    Delete {
        id: WebhookId,
        name: String,
    },
}

impl WebhookChange {
    pub fn op(&self) -> ChangeOp {
        match self {
            Self::Create { .. } => ChangeOp::Create,
            Self::Update { .. } => ChangeOp::Update,
            Self::Delete { .. } => ChangeOp::Delete,
        }
    }

    /// Name of the webhook this change targets.
    pub fn name(&self) -> &str {
        match self {
            Self::Create { manifest } | Self::Update { manifest, .. } => &manifest.name,
            Self::Delete { name, .. } => name,
        }
    }

    pub fn webhook_id(&self) -> Option<&WebhookId> {
        match self {
            Self::Create { .. } => None,
            Self::Update { id, .. } | Self::Delete { id, .. } => Some(id),
        }
    }
}

impl fmt::Display for WebhookChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.op(), self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum ChangeStatus {
    /// Computed but not sent (dry run, or not reached).
    Planned,
    Applied,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    #[serde(flatten)]
    pub change: WebhookChange,
    pub status: ChangeStatus,
}

impl ChangeRecord {
    pub fn planned(change: WebhookChange) -> Self {
        Self {
            change,
            status: ChangeStatus::Planned,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ChangeStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoExistingWebhooks,
    NoCallbackUrl,
    NoManifests,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExistingWebhooks => write!(f, "no existing webhooks"),
            Self::NoCallbackUrl => write!(f, "no callback URL configured"),
            Self::NoManifests => write!(f, "provider produced no manifests"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    DryRun,
    Skipped(SkipReason),
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::DryRun => write!(f, "dry-run"),
            Self::Skipped(_) => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Settled state of one tenant after reconciliation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub api_origin: Url,
    pub outcome: Outcome,
    pub changes: Vec<ChangeRecord>,
    #[serde(serialize_with = "serialize_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<ReconcileError>,
}

impl ReconciliationResult {
    pub fn applied(api_origin: Url, changes: Vec<ChangeRecord>) -> Self {
        Self {
            api_origin,
            outcome: Outcome::Applied,
            changes,
            error: None,
        }
    }

    pub fn dry_run(api_origin: Url, changes: Vec<ChangeRecord>) -> Self {
        Self {
            api_origin,
            outcome: Outcome::DryRun,
            changes,
            error: None,
        }
    }

    pub fn skipped(api_origin: Url, reason: SkipReason) -> Self {
        Self {
            api_origin,
            outcome: Outcome::Skipped(reason),
            changes: Vec::new(),
            error: None,
        }
    }

    pub fn failed(api_origin: Url, error: ReconcileError, changes: Vec<ChangeRecord>) -> Self {
        Self {
            api_origin,
            outcome: Outcome::Failed,
            changes,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self.outcome {
            Outcome::Skipped(reason) => Some(reason),
            _ => None,
        }
    }

    /// Records whose operation failed during apply.
    pub fn failed_changes(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.changes.iter().filter(|record| record.is_failed())
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<ReconcileError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_str(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
