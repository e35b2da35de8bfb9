//! # Deployment Orchestration
//!
//! The pipeline that turns a rollout request into a finalized run record:
//! stage executors for sequential and parallel deploy units, plus the
//! orchestrator that drives validation, deployment, verification, report,
//! and notification in order.

pub mod core;
pub mod stage_executor;
pub mod types;

pub use self::core::{Orchestrator, RolloutRequest};
pub use stage_executor::StageExecutor;
pub use types::{RolloutStages, RunSummary, StageOutcome, UnitOutcome};
