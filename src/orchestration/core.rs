//! # Orchestrator
//!
//! Drives a rollout end to end: pre-flight validation, infrastructure,
//! backend services in order, platform widgets sequentially or in parallel,
//! post-deployment health and check phases, then report and notification.
//! A fatal failure short-circuits the remaining deploy stages, but every run
//! — successful or not — produces a finalized record, a report, and exactly
//! one notification.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::stage_executor::StageExecutor;
use super::types::{RolloutStages, RunSummary, StageOutcome};
use crate::config::OrchestratorConfig;
use crate::error::{Result, RolloutError};
use crate::health::{Endpoint, HealthChecker, HealthProbe, HttpProbe};
use crate::notify::Notifier;
use crate::preflight::Preflight;
use crate::report::ReportGenerator;
use crate::state_machine::RunStatus;
use crate::store::{generate_run_id, DeployCategory, StatusStore};
use crate::units::DeployUnit;

/// Everything one orchestrator invocation needs
pub struct RolloutRequest {
    pub stages: RolloutStages,
    pub health_endpoints: Vec<Endpoint>,
    /// Blocking post-deploy check; failure is fatal
    pub integration_check: Option<Arc<dyn DeployUnit>>,
    /// Advisory post-deploy check; failure is recorded as a warning
    pub performance_check: Option<Arc<dyn DeployUnit>>,
    /// None skips pre-flight validation entirely
    pub preflight: Option<Preflight>,
    pub parallel_platforms: bool,
    pub report_path: Option<PathBuf>,
}

pub struct Orchestrator {
    store: Arc<StatusStore>,
    config: OrchestratorConfig,
    notifier: Notifier,
    health_probe: Arc<dyn HealthProbe>,
}

impl Orchestrator {
    pub fn new(store: Arc<StatusStore>, config: OrchestratorConfig, notifier: Notifier) -> Self {
        let health_probe = Arc::new(HttpProbe::new(Duration::from_millis(
            config.http_timeout_ms,
        )));
        Self {
            store,
            config,
            notifier,
            health_probe,
        }
    }

    /// Swap the health probe implementation (tests, non-HTTP surfaces)
    pub fn with_health_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.health_probe = probe;
        self
    }

    /// Run the full pipeline for one rollout
    pub async fn run(&self, request: RolloutRequest) -> Result<RunSummary> {
        let run_id = generate_run_id();
        info!(run_id = %run_id, "🚀 Starting deployment run");

        self.store.create(&run_id, &request.stages.plan()).await?;

        let fatal = self.execute_pipeline(&run_id, &request).await;

        // Report and notification run for every outcome
        let status = if fatal.is_none() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };

        let generator = ReportGenerator::new(self.store.clone());
        let run = generator.finalize(&run_id, status).await?;
        let report = generator.render(&run);
        let report_path = request
            .report_path
            .clone()
            .unwrap_or_else(|| self.config.report_path.clone());
        if let Err(err) = generator.write(&report, &report_path).await {
            // The run verdict stands even when the report file cannot land
            warn!(run_id = %run_id, error = %err, "Failed to write deployment report");
        }

        let summary = match &fatal {
            None => format!(
                "Rollout {run_id} completed: {} component(s) deployed",
                run.components().count()
            ),
            Some(err) => format!("Rollout {run_id} failed: {err}"),
        };
        self.notifier.notify(&run_id, status, summary).await;

        match fatal {
            None => {
                info!(run_id = %run_id, "Deployment run completed");
                Ok(RunSummary {
                    run_id,
                    status,
                    report,
                    warnings: run.warnings,
                })
            }
            Some(err) => {
                error!(run_id = %run_id, error = %err, "Deployment run failed");
                Err(err)
            }
        }
    }

    /// Execute the deploy and verification stages, returning the first fatal
    /// error instead of propagating it, so finalization always runs
    async fn execute_pipeline(
        &self,
        run_id: &str,
        request: &RolloutRequest,
    ) -> Option<RolloutError> {
        if let Some(preflight) = &request.preflight {
            let report = preflight.validate().await;
            if let Err(err) = report.into_result() {
                return Some(err);
            }
        } else {
            warn!(run_id = %run_id, "Pre-flight validation skipped by request");
        }

        let executor = StageExecutor::new(self.store.clone(), run_id);

        let deploy_stages: [(DeployCategory, &[Arc<dyn DeployUnit>], bool); 3] = [
            (
                DeployCategory::Infrastructure,
                &request.stages.infrastructure,
                false,
            ),
            (DeployCategory::Services, &request.stages.services, false),
            (
                DeployCategory::Platforms,
                &request.stages.platforms,
                request.parallel_platforms,
            ),
        ];

        for (category, units, parallel) in deploy_stages {
            if units.is_empty() {
                continue;
            }
            let outcome = if parallel {
                executor.run_parallel(category, units).await
            } else {
                executor.run_sequential(category, units).await
            };
            match outcome {
                Ok(stage) => {
                    if let Some(err) = stage_failure(&stage) {
                        return Some(err);
                    }
                }
                Err(err) => return Some(err),
            }
        }

        if !request.health_endpoints.is_empty() {
            let checker = HealthChecker::new(
                self.health_probe.clone(),
                self.config.health_max_retries,
                Duration::from_millis(self.config.health_retry_delay_ms),
            );
            let report = checker.check_all(&request.health_endpoints).await;
            if !report.is_healthy() {
                return Some(RolloutError::HealthCheck {
                    unhealthy: report.unhealthy().len(),
                    total: report.results.len(),
                });
            }
        }

        if let Some(check) = &request.integration_check {
            info!(run_id = %run_id, check = check.name(), "Running integration checks");
            if let Err(failure) = check.execute().await {
                // Blocking verification, same class as an unhealthy endpoint
                error!(
                    run_id = %run_id,
                    check = check.name(),
                    error = %failure.message,
                    "Integration checks failed"
                );
                return Some(RolloutError::HealthCheck {
                    unhealthy: 1,
                    total: 1,
                });
            }
        }

        if let Some(check) = &request.performance_check {
            info!(run_id = %run_id, check = check.name(), "Running performance checks");
            if let Err(failure) = check.execute().await {
                // Advisory: recorded, never fatal
                if let Err(err) = self
                    .store
                    .record_warning(
                        run_id,
                        format!("{} failed: {}", check.name(), failure.message),
                    )
                    .await
                {
                    return Some(err);
                }
            }
        }

        None
    }
}

/// Map a failed stage to the fatal component error
fn stage_failure(stage: &StageOutcome) -> Option<RolloutError> {
    stage.failures().next().map(|outcome| RolloutError::ComponentFailure {
        component: outcome.component.clone(),
        message: outcome
            .error
            .clone()
            .unwrap_or_else(|| "deploy unit failed".to_string()),
    })
}
