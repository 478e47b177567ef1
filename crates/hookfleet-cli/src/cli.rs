use clap::{Parser, ValueEnum};
use hookfleet_core::Mode;

#[derive(Parser, Debug)]
#[command(name = "hookfleet")]
#[command(about = "Hookfleet: bring app webhooks in line across every tenant installation")]
#[command(version)]
pub struct Cli {
    /// Compute and report changes without sending any mutation
    #[arg(long)]
    pub dry_run: bool,

    /// Configuration file (defaults to ./hookfleet.toml when present)
    #[arg(short, long, env = "HOOKFLEET_CONFIG")]
    pub config: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Log level (overrides logging.level)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Apply
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
