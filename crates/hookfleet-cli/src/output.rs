use anyhow::{Context, Result};
use colored::Colorize;
use hookfleet_core::{
    ChangeOp, ChangeStatus, FleetReport, Outcome, ReconciliationResult, RunSummary,
};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_report(report: &FleetReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(report).context("Failed to serialize report")?;
            println!("{json}");
        }
        OutputFormat::Table => {
            if report.is_empty() {
                println!("No tenants found.");
            } else {
                println!("{}", tenant_table(report));
                if let Some(changes) = change_table(report) {
                    println!("{changes}");
                }
            }
            print_summary(report);
        }
    }
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn print_summary(report: &FleetReport) {
    let summary = report.summary();
    let line = summary_line(report, &summary);
    if summary.failed > 0 {
        print_error(&line);
    } else {
        print_success(&line);
    }
}

fn summary_line(report: &FleetReport, summary: &RunSummary) -> String {
    format!(
        "{} finished: {} tenants ({} applied, {} dry-run, {} skipped, {} failed), {} webhook changes",
        report.mode,
        summary.tenants,
        summary.applied,
        summary.dry_run,
        summary.skipped,
        summary.failed,
        summary.changes
    )
}

fn tenant_table(report: &FleetReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Tenant", "Outcome", "Changes", "Details"]);
    for result in report.results.values() {
        builder.push_record([
            result.api_origin.to_string(),
            result.outcome.to_string(),
            change_counts(result),
            details(result),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// One row per planned or attempted operation; `None` when there are none.
fn change_table(report: &FleetReport) -> Option<String> {
    let mut builder = Builder::default();
    builder.push_record(["Tenant", "Operation", "Webhook", "Status"]);
    let mut rows = 0;
    for result in report.results.values() {
        for record in &result.changes {
            let status = match &record.status {
                ChangeStatus::Planned => "planned".to_string(),
                ChangeStatus::Applied => "applied".to_string(),
                ChangeStatus::Failed(e) => format!("failed: {e}"),
            };
            builder.push_record([
                result.api_origin.to_string(),
                record.change.op().to_string(),
                record.change.name().to_string(),
                status,
            ]);
            rows += 1;
        }
    }
    (rows > 0).then(|| builder.build().with(Style::rounded()).to_string())
}

fn change_counts(result: &ReconciliationResult) -> String {
    let count = |op: ChangeOp| {
        result
            .changes
            .iter()
            .filter(|r| r.change.op() == op)
            .count()
    };
    let parts: Vec<String> = [ChangeOp::Create, ChangeOp::Update, ChangeOp::Delete]
        .into_iter()
        .map(|op| (op, count(op)))
        .filter(|(_, n)| *n > 0)
        .map(|(op, n)| format!("{n} {op}"))
        .collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

fn details(result: &ReconciliationResult) -> String {
    match (&result.outcome, &result.error) {
        (Outcome::Skipped(reason), _) => reason.to_string(),
        (_, Some(error)) => error.to_string(),
        _ => "-".to_string(),
    }
}
