#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Rollout Core
//!
//! Deployment orchestration engine for multi-platform storefront rollouts.
//!
//! ## Overview
//!
//! Rollout Core coordinates the rollout of infrastructure, backend services,
//! and storefront-platform widgets. Each deployable is an opaque
//! [`units::DeployUnit`]; the engine tracks every component through a durable
//! JSON status record, runs ordered stages fail-fast and independent stages
//! in parallel, verifies the rollout with bounded-retry health polling, and
//! closes every run with a markdown report plus best-effort notifications.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - Component and run lifecycle state management
//! - [`store`] - Durable run records (the status store)
//! - [`preflight`] - Pre-flight prerequisite validation
//! - [`units`] - Deploy unit abstraction and command-backed units
//! - [`orchestration`] - Stage executors and the pipeline orchestrator
//! - [`health`] - Post-deployment health checking
//! - [`report`] - Human-readable deployment reports
//! - [`notify`] - Best-effort notification sinks
//! - [`manifest`] - Rollout manifest loading and validation
//! - [`config`] - Orchestrator configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rollout_core::config::OrchestratorConfig;
//! use rollout_core::manifest::RolloutManifest;
//! use rollout_core::orchestration::Orchestrator;
//! use rollout_core::store::StatusStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OrchestratorConfig::from_env()?;
//! let store = Arc::new(StatusStore::open(&config.status_dir)?);
//! let manifest = RolloutManifest::load(Path::new("rollout.yml"))?;
//!
//! let orchestrator = Orchestrator::new(store, config, manifest.build_notifier());
//! let summary = orchestrator
//!     .run(manifest.to_request("v2.4.1", true, false))
//!     .await?;
//! println!("{}", summary.report);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod manifest;
pub mod notify;
pub mod orchestration;
pub mod preflight;
pub mod report;
pub mod state_machine;
pub mod store;
pub mod units;

pub use config::OrchestratorConfig;
pub use error::{Result, RolloutError};
pub use health::{Endpoint, HealthChecker, HealthProbe, HealthReport, HttpProbe};
pub use manifest::RolloutManifest;
pub use notify::{LogSink, NotificationSink, Notifier, WebhookSink};
pub use orchestration::{
    Orchestrator, RolloutRequest, RolloutStages, RunSummary, StageExecutor, StageOutcome,
    UnitOutcome,
};
pub use preflight::{CommandProbe, LivenessProbe, Preflight, ValidationReport};
pub use report::ReportGenerator;
pub use state_machine::{ComponentEvent, ComponentStatus, RunStatus, StateMachineError};
pub use store::{DeployCategory, DeploymentRun, RolloutPlan, StatusStore};
pub use units::{CommandUnit, DeployUnit, FnUnit, UnitFailure};
