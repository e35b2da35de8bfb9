//! # Stage Executor
//!
//! Runs a category's deploy units either sequentially (ordered, dependent
//! units: fail fast, later units never start) or in parallel (independent
//! units: every unit runs regardless of sibling failures, all outcomes
//! collected before returning). The executor owns the component state
//! transitions: one deploy unit drives exactly one component, in_progress
//! before invocation, terminal after.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::types::{StageOutcome, UnitOutcome};
use crate::error::Result;
use crate::state_machine::{ComponentEvent, ComponentStatus};
use crate::store::{DeployCategory, StatusStore};
use crate::units::{DeployUnit, UnitResult};

/// Executor for one run's deploy stages
pub struct StageExecutor {
    store: Arc<StatusStore>,
    run_id: String,
}

impl StageExecutor {
    pub fn new(store: Arc<StatusStore>, run_id: impl Into<String>) -> Self {
        Self {
            store,
            run_id: run_id.into(),
        }
    }

    /// Execute units in the exact order supplied, stopping at the first
    /// failure. The failing component is recorded `failed`; units after it
    /// are never started and stay `pending`.
    pub async fn run_sequential(
        &self,
        category: DeployCategory,
        units: &[Arc<dyn DeployUnit>],
    ) -> Result<StageOutcome> {
        debug!(
            run_id = %self.run_id,
            category = %category,
            unit_count = units.len(),
            "Starting sequential stage"
        );

        let mut outcomes = Vec::with_capacity(units.len());
        for unit in units {
            self.store
                .transition(&self.run_id, category, unit.name(), ComponentEvent::Start)
                .await?;

            let started = Instant::now();
            let result = unit.execute().await;
            let outcome = self
                .record_terminal(category, unit.name(), result, started.elapsed())
                .await?;

            let failed = !outcome.succeeded();
            outcomes.push(outcome);
            if failed {
                break;
            }
        }

        let outcome = StageOutcome { category, outcomes };
        self.log_stage_done("sequential", &outcome);
        Ok(outcome)
    }

    /// Start every unit concurrently regardless of sibling failures, wait
    /// for all of them, and aggregate. Every unit reaches a terminal state;
    /// a panicking unit is recorded as failed with the panic text. No
    /// ordering is guaranteed among units, only that all outcomes are
    /// collected before returning.
    pub async fn run_parallel(
        &self,
        category: DeployCategory,
        units: &[Arc<dyn DeployUnit>],
    ) -> Result<StageOutcome> {
        debug!(
            run_id = %self.run_id,
            category = %category,
            unit_count = units.len(),
            "Starting parallel stage"
        );

        // Mark every component in_progress before any unit starts, so the
        // record never claims a spawned unit is still pending
        for unit in units.iter() {
            self.store
                .transition(&self.run_id, category, unit.name(), ComponentEvent::Start)
                .await?;
        }

        let mut handles = Vec::with_capacity(units.len());
        for unit in units.iter() {
            let component = unit.name().to_string();
            let unit = Arc::clone(unit);
            let handle = tokio::spawn(async move {
                let started = Instant::now();
                let result = unit.execute().await;
                (result, started.elapsed())
            });
            handles.push((component, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (component, handle) in handles {
            let (result, duration) = match handle.await {
                Ok((result, duration)) => (result, duration),
                Err(e) => {
                    error!(
                        run_id = %self.run_id,
                        component = %component,
                        error = %e,
                        "Deploy unit task panicked"
                    );
                    (
                        Err(crate::units::UnitFailure::new(format!("task panicked: {e}"))),
                        Duration::ZERO,
                    )
                }
            };
            outcomes.push(
                self.record_terminal(category, &component, result, duration)
                    .await?,
            );
        }

        let outcome = StageOutcome { category, outcomes };
        self.log_stage_done("parallel", &outcome);
        Ok(outcome)
    }

    /// Record a unit's terminal transition and build its outcome
    async fn record_terminal(
        &self,
        category: DeployCategory,
        component: &str,
        result: UnitResult,
        duration: Duration,
    ) -> Result<UnitOutcome> {
        let (event, error) = match result {
            Ok(()) => (ComponentEvent::Complete, None),
            Err(failure) => (
                ComponentEvent::fail_with_error(failure.message.clone()),
                Some(failure.message),
            ),
        };

        let status = self
            .store
            .transition(&self.run_id, category, component, event)
            .await?;

        Ok(UnitOutcome {
            component: component.to_string(),
            status,
            error,
            duration,
        })
    }

    fn log_stage_done(&self, mode: &str, outcome: &StageOutcome) {
        info!(
            run_id = %self.run_id,
            category = %outcome.category,
            mode = mode,
            executed = outcome.outcomes.len(),
            succeeded = outcome
                .outcomes
                .iter()
                .filter(|o| o.status == ComponentStatus::Completed)
                .count(),
            failed = outcome
                .outcomes
                .iter()
                .filter(|o| o.status == ComponentStatus::Failed)
                .count(),
            "Stage execution completed"
        );
    }
}
