//! Command-line runner for Hookfleet: configuration, the static manifest
//! provider and report rendering. The binary lives in `main.rs`.

pub mod cli;
pub mod config;
pub mod observability;
pub mod output;
pub mod provider;
