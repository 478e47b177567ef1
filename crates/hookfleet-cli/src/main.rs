use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hookfleet_client::{CloudRegistry, FileRegistry, GatewaySettings, HttpGatewayFactory};
use hookfleet_core::{
    FleetReport, FleetRunner, ReconcileEngine, ReconcileLog, Secret, TenantRegistry, TracingLog,
};
use url::Url;

use hookfleet_cli::cli::Cli;
use hookfleet_cli::config::loader::load_config;
use hookfleet_cli::config::{AppConfig, RegistryKind};
use hookfleet_cli::observability::init_tracing;
use hookfleet_cli::output::{print_error, print_report};
use hookfleet_cli::provider::StaticManifestProvider;

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();

    let mut cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    if let Some(level) = &cli.log_level {
        cfg.logging.level = level.clone();
        if let Err(e) = cfg.validate() {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    }

    init_tracing(&cfg.logging.level, cfg.logging.json);

    if let Err(e) = cfg.check_credentials() {
        print_error(&e);
        std::process::exit(1);
    }

    let report = match run(&cli, &cfg).await {
        Ok(report) => report,
        Err(e) => {
            print_error(&format!("{e:#}"));
            std::process::exit(1);
        }
    };

    if let Err(e) = print_report(&report, cli.format) {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, cfg: &AppConfig) -> Result<FleetReport> {
    let settings = GatewaySettings {
        request_timeout: Duration::from_millis(cfg.gateway.request_timeout_ms),
        user_agent: cfg.gateway.user_agent.clone(),
    };
    let gateways = HttpGatewayFactory::new(&settings).context("Failed to create the HTTP client")?;
    let registry = build_registry(cfg, &settings)?;
    let registry_name = registry.registry_name();

    let provider = Arc::new(StaticManifestProvider::new(cfg.webhooks.clone()));
    let log: Arc<dyn ReconcileLog> = Arc::new(TracingLog);
    let engine = Arc::new(ReconcileEngine::new(provider, Arc::clone(&log)));

    let mut runner = FleetRunner::new(registry, Arc::new(gateways), engine, log);
    if let Some(limit) = cfg.runner.max_concurrency {
        runner = runner.with_max_concurrency(limit);
    }

    tracing::info!(
        mode = %cli.mode(),
        webhooks = cfg.webhooks.len(),
        registry = registry_name,
        "Configuration loaded"
    );

    runner
        .run(cli.mode())
        .await
        .context("Could not fetch tenants from the registry")
}

fn build_registry(cfg: &AppConfig, settings: &GatewaySettings) -> Result<Arc<dyn TenantRegistry>> {
    match cfg.registry.kind {
        RegistryKind::Cloud => {
            let endpoint = cfg
                .registry
                .endpoint
                .as_deref()
                .context("registry.endpoint is not set")?;
            let endpoint = Url::parse(endpoint.trim()).context("Invalid registry.endpoint")?;
            let token = cfg
                .registry
                .token
                .clone()
                .context("registry.token is not set")?;
            let http = reqwest::Client::builder()
                .timeout(settings.request_timeout)
                .user_agent(settings.user_agent.as_str())
                .build()
                .context("Failed to create the registry HTTP client")?;
            Ok(Arc::new(
                CloudRegistry::new(http, endpoint, Secret::new(token))
                    .with_page_size(cfg.registry.page_size),
            ))
        }
        RegistryKind::File => {
            let path = cfg
                .registry
                .path
                .clone()
                .context("registry.path is not set")?;
            Ok(Arc::new(FileRegistry::new(path)))
        }
    }
}
