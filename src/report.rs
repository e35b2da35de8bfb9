//! # Deployment Report
//!
//! Renders the human-readable summary of a run: overall status, total
//! duration, and one table per category with per-component status and
//! duration. The tabular layout is a contract — downstream tooling parses
//! it — so column order and cell formats stay fixed. The report generator
//! also closes out the run: it sets the terminal status and end time on the
//! status record before rendering.

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{Result, RolloutError};
use crate::state_machine::RunStatus;
use crate::store::{ComponentRecord, DeployCategory, DeploymentRun, StatusStore};

pub struct ReportGenerator {
    store: Arc<StatusStore>,
}

impl ReportGenerator {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self { store }
    }

    /// Set the run's terminal status, then return the finalized record
    pub async fn finalize(&self, run_id: &str, status: RunStatus) -> Result<DeploymentRun> {
        self.store.finalize(run_id, status).await
    }

    /// Render the markdown report for a run record
    pub fn render(&self, run: &DeploymentRun) -> String {
        let mut doc = String::new();

        doc.push_str("# Deployment Report\n\n");
        doc.push_str(&format!("- Run: {}\n", run.id));
        doc.push_str(&format!("- Status: {}\n", run.overall_status));
        doc.push_str(&format!(
            "- Started: {}\n",
            run.start_time.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        doc.push_str(&format!("- Duration: {}\n", total_duration_cell(run)));

        for category in DeployCategory::all() {
            let Some(components) = run.categories.get(&category) else {
                continue;
            };

            doc.push_str(&format!("\n## {}\n\n", category.title()));
            doc.push_str("| Component | Status | Duration |\n");
            doc.push_str("|-----------|--------|----------|\n");
            for (name, record) in components {
                doc.push_str(&format!(
                    "| {name} | {} | {} |\n",
                    record.status,
                    duration_cell(record)
                ));
            }
        }

        if !run.warnings.is_empty() {
            doc.push_str("\n## Warnings\n\n");
            for warning in &run.warnings {
                doc.push_str(&format!("- {warning}\n"));
            }
        }

        doc
    }

    /// Write a rendered report to the caller-specified location
    pub async fn write(&self, report: &str, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| RolloutError::storage("create report directory", e))?;
            }
        }
        tokio::fs::write(path, report)
            .await
            .map_err(|e| RolloutError::storage("write report", e))?;

        info!(path = %path.display(), "📄 Deployment report written");
        Ok(())
    }
}

/// Per-component duration cell: whole seconds when both timestamps exist
fn duration_cell(record: &ComponentRecord) -> String {
    record
        .duration()
        .map_or_else(|| "N/A".to_string(), |d| format!("{}s", d.num_seconds()))
}

/// Total run duration cell; a run still open renders as in progress
fn total_duration_cell(run: &DeploymentRun) -> String {
    run.duration()
        .map_or_else(|| "In progress".to_string(), |d| format!("{}s", d.num_seconds()))
}
