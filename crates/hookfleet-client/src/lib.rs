//! HTTP adapters for `hookfleet-core`.
//!
//! - [`HttpGatewayFactory`] / [`HttpGateway`]: GraphQL over HTTPS with a
//!   per-tenant bearer token.
//! - [`CloudRegistry`]: the paginated installation list of the cloud auth
//!   store.
//! - [`FileRegistry`]: a static TOML tenant list for local runs.

pub mod gateway;
pub mod registry;

pub use gateway::{GatewaySettings, HttpGateway, HttpGatewayFactory};
pub use registry::{CloudRegistry, DEFAULT_PAGE_SIZE, FileRegistry};
