//! Error types for webhook reconciliation.
//!
//! Only [`RegistryError`] is fatal for a run. Everything else is scoped to a
//! single tenant and ends up inside that tenant's `ReconciliationResult`.

use std::fmt;

/// Errors returned by a tenant's API gateway.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced an HTTP response.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The GraphQL response carried top-level errors.
    #[error("GraphQL error: {}", .messages.join("; "))]
    Graphql {
        /// Messages reported by the API.
        messages: Vec<String>,
    },

    /// A mutation returned a non-empty `errors` list.
    #[error("{operation} rejected: {}", .messages.join("; "))]
    Mutation {
        /// Mutation field name, e.g. `webhookCreate`.
        operation: String,
        /// Messages reported by the API.
        messages: Vec<String>,
    },

    /// The response could not be decoded into the expected shape.
    #[error("Unexpected response: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// The token does not resolve to an installed app.
    #[error("App not found for the provided token")]
    AppNotFound,
}

impl GatewayError {
    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new `Status` error.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Creates a new `Graphql` error.
    #[must_use]
    pub fn graphql(messages: Vec<String>) -> Self {
        Self::Graphql { messages }
    }

    /// Creates a new `Mutation` error.
    #[must_use]
    pub fn mutation(operation: impl Into<String>, messages: Vec<String>) -> Self {
        Self::Mutation {
            operation: operation.into(),
            messages,
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns `true` for 401/403 responses.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Errors raised while listing tenants. These abort the whole run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// The backing store could not be reached or refused the request.
    #[error("Registry unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The registry answered with something that is not a tenant list.
    #[error("Invalid registry response: {message}")]
    InvalidResponse {
        /// Description of the failure.
        message: String,
    },
}

impl RegistryError {
    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

/// Error raised by a manifest provider.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Manifest provider failed: {message}")]
pub struct ProviderError {
    /// Description of the failure.
    pub message: String,
}

impl ProviderError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Desired state that cannot be reconciled as given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Two desired manifests share a name.
    #[error("Duplicate manifest name: {name}")]
    DuplicateManifestName {
        /// The repeated name.
        name: String,
    },
}

/// Per-tenant failure carried by a `Failed` result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReconcileError {
    /// App details (or the gateway itself) could not be obtained.
    #[error("Failed to fetch app details: {0}")]
    TenantFetch(#[source] GatewayError),

    /// The app URL is set but is not an absolute URL with an origin.
    #[error("Invalid app URL {url:?}: {message}")]
    InvalidCallbackUrl {
        /// The URL as reported by the tenant.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    #[error(transparent)]
    ManifestProvider(#[from] ProviderError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// At least one create/update/delete call failed.
    #[error("{failed} of {attempted} webhook operations failed")]
    TenantApply {
        /// Number of failed operations.
        failed: usize,
        /// Number of attempted operations.
        attempted: usize,
    },

    /// The tenant's unit of work panicked.
    #[error("Reconciliation task panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl ReconcileError {
    /// Creates a new `InvalidCallbackUrl` error.
    #[must_use]
    pub fn invalid_callback_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCallbackUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Panicked` error.
    #[must_use]
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }

    /// Returns the error category for logging and reporting.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TenantFetch(_) | Self::InvalidCallbackUrl { .. } => ErrorCategory::Fetch,
            Self::ManifestProvider(_) => ErrorCategory::Provider,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::TenantApply { .. } => ErrorCategory::Apply,
            Self::Panicked { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of tenant failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Fetch,
    Provider,
    Configuration,
    Apply,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Provider => write!(f, "provider"),
            Self::Configuration => write!(f, "configuration"),
            Self::Apply => write!(f, "apply"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
