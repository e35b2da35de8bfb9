//! # Orchestration Types
//!
//! Result types shared across the orchestration pipeline: per-unit outcomes,
//! per-stage aggregates, and the run summary handed back to the caller.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::state_machine::{ComponentStatus, RunStatus};
use crate::store::{DeployCategory, RolloutPlan};
use crate::units::DeployUnit;

/// Terminal result of one deploy unit invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub component: String,
    pub status: ComponentStatus,
    pub error: Option<String>,
    pub duration: Duration,
}

impl UnitOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == ComponentStatus::Completed
    }
}

/// Aggregate result of one executor stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub category: DeployCategory,
    pub outcomes: Vec<UnitOutcome>,
}

impl StageOutcome {
    /// True iff any unit in the stage failed
    pub fn failed(&self) -> bool {
        self.outcomes.iter().any(|o| !o.succeeded())
    }

    /// Every failed outcome in the stage
    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

/// The deploy units of one rollout, grouped by category
#[derive(Default)]
pub struct RolloutStages {
    pub infrastructure: Vec<Arc<dyn DeployUnit>>,
    pub services: Vec<Arc<dyn DeployUnit>>,
    pub platforms: Vec<Arc<dyn DeployUnit>>,
}

impl RolloutStages {
    /// The component plan registered on the run record at creation
    pub fn plan(&self) -> RolloutPlan {
        let names = |units: &[Arc<dyn DeployUnit>]| {
            units.iter().map(|u| u.name().to_string()).collect()
        };
        RolloutPlan {
            infrastructure: names(&self.infrastructure),
            services: names(&self.services),
            platforms: names(&self.platforms),
        }
    }
}

/// Terminal summary of one orchestrator invocation
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub report: String,
    pub warnings: Vec<String>,
}
