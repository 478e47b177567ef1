use std::{env, fs};

use hookfleet_cli::config::RegistryKind;
use hookfleet_cli::config::loader::load_config;

const FLEET_TOML: &str = r#"
[registry]
kind = "cloud"
endpoint = "https://apl.example.com/api/v1/saleor-app/"
token = "file-token"
page_size = 250

[gateway]
request_timeout_ms = 5000
user_agent = "hookfleet-test"

[runner]
max_concurrency = 8

[logging]
level = "debug"
json = true

[[webhooks]]
name = "Order Created"
path = "api/webhooks/order-created"
async_events = ["ORDER_CREATED"]
query = "subscription { event { __typename } }"

[[webhooks]]
name = "Checkout Taxes"
path = "api/webhooks/checkout-calculate-taxes"
sync_events = ["CHECKOUT_CALCULATE_TAXES"]
secret = "s3cr3t"
"#;

#[test]
fn config_parsing_and_env_overrides() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("hookfleet.toml");
    fs::write(&path, FLEET_TOML).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.registry.kind, RegistryKind::Cloud);
    assert_eq!(cfg.registry.page_size, 250);
    assert_eq!(cfg.registry.token.as_deref(), Some("file-token"));
    assert_eq!(cfg.gateway.request_timeout_ms, 5000);
    assert_eq!(cfg.runner.max_concurrency, Some(8));
    assert_eq!(cfg.logging.level, "debug");
    assert!(cfg.logging.json);
    assert_eq!(cfg.webhooks.len(), 2);
    assert_eq!(
        cfg.webhooks[1].sync_events,
        vec!["CHECKOUT_CALCULATE_TAXES".to_string()]
    );
    assert_eq!(cfg.webhooks[1].secret.as_deref(), Some("s3cr3t"));
    assert!(cfg.check_credentials().is_ok());

    // 2) Env override should win over file
    unsafe {
        env::set_var("HOOKFLEET__REGISTRY__TOKEN", "env-token");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.registry.token.as_deref(), Some("env-token"));
    unsafe {
        env::remove_var("HOOKFLEET__REGISTRY__TOKEN");
    }
}

#[test]
fn config_validation_failures() {
    let dir = tempfile::tempdir().expect("tmp dir");

    let path = dir.path().join("duplicate.toml");
    let duplicate = FLEET_TOML.replace("Checkout Taxes", "Order Created");
    fs::write(&path, duplicate).expect("write toml");
    let err = load_config(path.to_str()).expect_err("duplicate names must fail");
    assert!(err.contains("duplicate webhook name"));

    let path = dir.path().join("level.toml");
    fs::write(&path, FLEET_TOML.replace("\"debug\"", "\"chatty\"")).expect("write toml");
    let err = load_config(path.to_str()).expect_err("invalid level must fail");
    assert!(err.contains("logging.level"));

    let path = dir.path().join("malformed.toml");
    fs::write(&path, "[runner]\nmax_concurrency = \"lots\"\n").expect("write toml");
    assert!(load_config(path.to_str()).is_err());
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");

    let err = load_config(path.to_str()).expect_err("missing file must fail");
    assert!(err.contains("config file not found"));
}

#[test]
fn file_registry_without_credentials() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("local.toml");
    fs::write(
        &path,
        r#"
[registry]
kind = "file"
path = "tenants.toml"

[[webhooks]]
name = "Order Created"
path = "api/webhooks/order-created"
async_events = ["ORDER_CREATED"]
"#,
    )
    .expect("write toml");

    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.registry.kind, RegistryKind::File);
    assert!(cfg.check_credentials().is_ok());
    assert_eq!(cfg.logging.level, "info");
    assert_eq!(cfg.gateway.request_timeout_ms, 30_000);
}
