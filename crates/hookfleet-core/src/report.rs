//! Aggregate result of a fleet run.

use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use crate::model::{Mode, Outcome, ReconciliationResult};

/// Mapping from tenant origin to its settled result.
#[derive(Debug, Serialize)]
pub struct FleetReport {
    pub mode: Mode,
    pub results: BTreeMap<Url, ReconciliationResult>,
}

/// Outcome counts across a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub tenants: usize,
    pub applied: usize,
    pub dry_run: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Planned or attempted webhook operations across all tenants.
    pub changes: usize,
}

impl FleetReport {
    pub fn new(mode: Mode, results: BTreeMap<Url, ReconciliationResult>) -> Self {
        Self { mode, results }
    }

    pub fn get(&self, origin: &Url) -> Option<&ReconciliationResult> {
        self.results.get(origin)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReconciliationResult> {
        self.results.values().filter(|r| r.is_failed())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            tenants: self.results.len(),
            ..RunSummary::default()
        };
        for result in self.results.values() {
            match result.outcome {
                Outcome::Applied => summary.applied += 1,
                Outcome::DryRun => summary.dry_run += 1,
                Outcome::Skipped(_) => summary.skipped += 1,
                Outcome::Failed => summary.failed += 1,
            }
            summary.changes += result.changes.len();
        }
        summary
    }
}
