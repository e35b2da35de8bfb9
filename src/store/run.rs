//! # Run Record Data Model
//!
//! The persisted shape of a deployment run: one record per invocation of the
//! orchestrator, holding per-category, per-component status with timestamps.
//! Field names serialize in camelCase to keep the on-disk schema compatible
//! with existing report tooling; enum values serialize as snake_case strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::state_machine::{
    next_status, ComponentEvent, ComponentStatus, RunStatus, StateMachineError,
    StateMachineResult,
};

/// Deployment categories, in pipeline order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeployCategory {
    Infrastructure,
    Services,
    Platforms,
}

impl DeployCategory {
    /// All categories in pipeline order
    pub fn all() -> [DeployCategory; 3] {
        [Self::Infrastructure, Self::Services, Self::Platforms]
    }

    /// Section title for report rendering
    pub fn title(&self) -> &'static str {
        match self {
            Self::Infrastructure => "Infrastructure",
            Self::Services => "Services",
            Self::Platforms => "Platforms",
        }
    }
}

impl fmt::Display for DeployCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Services => write!(f, "services"),
            Self::Platforms => write!(f, "platforms"),
        }
    }
}

impl std::str::FromStr for DeployCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "infrastructure" => Ok(Self::Infrastructure),
            "services" => Ok(Self::Services),
            "platforms" => Ok(Self::Platforms),
            _ => Err(format!("Invalid deploy category: {s}")),
        }
    }
}

/// Ordered component names per category, registered when a run is created
/// so every component is inspectable as `pending` before anything starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloutPlan {
    pub infrastructure: Vec<String>,
    pub services: Vec<String>,
    pub platforms: Vec<String>,
}

impl RolloutPlan {
    /// Component names for one category, in execution order
    pub fn components(&self, category: DeployCategory) -> &[String] {
        match category {
            DeployCategory::Infrastructure => &self.infrastructure,
            DeployCategory::Services => &self.services,
            DeployCategory::Platforms => &self.platforms,
        }
    }

    /// Total number of components across all categories
    pub fn len(&self) -> usize {
        self.infrastructure.len() + self.services.len() + self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracked status record for one deploy unit within a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    pub status: ComponentStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ComponentRecord {
    /// Apply a transition event, updating timestamps and error text.
    ///
    /// Invariants maintained: `end_time` is set iff the status is terminal,
    /// `error` is set iff the status is `failed`.
    pub fn apply(&mut self, event: &ComponentEvent) -> StateMachineResult<ComponentStatus> {
        let target = next_status(self.status, event)?;
        let now = Utc::now();

        match target {
            ComponentStatus::InProgress => self.start_time = Some(now),
            ComponentStatus::Completed => self.end_time = Some(now),
            ComponentStatus::Failed => {
                self.end_time = Some(now);
                self.error = event.error_message().map(ToString::to_string);
            }
            ComponentStatus::Pending => {}
        }

        self.status = target;
        Ok(target)
    }

    /// Elapsed execution time, when both timestamps are present
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Persistent record of one orchestrator invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRun {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub overall_status: RunStatus,
    pub categories: BTreeMap<DeployCategory, BTreeMap<String, ComponentRecord>>,
    /// Advisory-check failures recorded during the run; never fatal
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl DeploymentRun {
    /// Create a new run with every planned component registered as pending
    pub fn new(id: impl Into<String>, plan: &RolloutPlan) -> Self {
        let mut categories = BTreeMap::new();
        for category in DeployCategory::all() {
            let components: BTreeMap<String, ComponentRecord> = plan
                .components(category)
                .iter()
                .map(|name| (name.clone(), ComponentRecord::default()))
                .collect();
            categories.insert(category, components);
        }

        Self {
            id: id.into(),
            start_time: Utc::now(),
            end_time: None,
            overall_status: RunStatus::InProgress,
            categories,
            warnings: Vec::new(),
        }
    }

    /// Look up one component's record
    pub fn component(&self, category: DeployCategory, name: &str) -> Option<&ComponentRecord> {
        self.categories.get(&category).and_then(|c| c.get(name))
    }

    /// Apply a transition event to one component
    pub fn apply_event(
        &mut self,
        category: DeployCategory,
        component: &str,
        event: &ComponentEvent,
    ) -> StateMachineResult<ComponentStatus> {
        let record = self
            .categories
            .get_mut(&category)
            .and_then(|c| c.get_mut(component))
            .ok_or_else(|| StateMachineError::UnknownComponent {
                category: category.to_string(),
                component: component.to_string(),
            })?;

        record.apply(event)
    }

    /// Iterate every component record with its category and name
    pub fn components(
        &self,
    ) -> impl Iterator<Item = (DeployCategory, &String, &ComponentRecord)> {
        self.categories.iter().flat_map(|(category, components)| {
            components.iter().map(move |(name, record)| (*category, name, record))
        })
    }

    /// True iff every component across all categories completed
    pub fn all_completed(&self) -> bool {
        self.components()
            .all(|(_, _, record)| record.status == ComponentStatus::Completed)
    }

    /// True iff any component failed
    pub fn any_failed(&self) -> bool {
        self.components()
            .any(|(_, _, record)| record.status == ComponentStatus::Failed)
    }

    /// Record an advisory-check failure
    pub fn record_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Set the terminal status and end time.
    ///
    /// Guards the run invariant: `completed` is only accepted when every
    /// component is completed, and a finalized run never changes again.
    pub fn finalize(&mut self, status: RunStatus) -> StateMachineResult<()> {
        if self.end_time.is_some() || self.overall_status.is_terminal() {
            return Err(StateMachineError::AlreadyFinalized {
                run_id: self.id.clone(),
            });
        }

        if !status.is_terminal() {
            return Err(StateMachineError::NonTerminalFinalStatus {
                status: status.to_string(),
            });
        }

        if status == RunStatus::Completed {
            if let Some((category, name, record)) = self
                .components()
                .find(|(_, _, record)| record.status != ComponentStatus::Completed)
            {
                return Err(StateMachineError::IncompleteRun {
                    run_id: self.id.clone(),
                    component: format!("{category}/{name}"),
                    status: record.status.to_string(),
                });
            }
        }

        self.overall_status = status;
        self.end_time = Some(Utc::now());
        Ok(())
    }

    /// Total run duration, when the run has ended
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Generate a timestamp-derived unique run id
pub fn generate_run_id() -> String {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("deploy-{stamp}-{}", &suffix[..8])
}
