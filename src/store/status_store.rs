//! # Status Store
//!
//! Durable record of orchestration progress. Each run is one JSON document
//! in the status directory; every mutation is written to a temp file and
//! atomically renamed into place before the call returns, so a crash between
//! transitions leaves an inspectable record of exactly which components
//! completed.
//!
//! Concurrency: runs live in a concurrent map; a per-run lock serializes
//! writes to one run's record. Transitions on different components of the
//! same run are safe; the executor guarantees by construction that exactly
//! one deploy unit drives one component.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::run::{DeployCategory, DeploymentRun, RolloutPlan};
use crate::error::{Result, RolloutError};
use crate::state_machine::{ComponentEvent, ComponentStatus, RunStatus};

struct RunSlot {
    run: RwLock<DeploymentRun>,
    path: PathBuf,
}

impl RunSlot {
    /// Serialize the record and durably write it: temp file, then rename
    async fn persist(&self, run: &DeploymentRun) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(run)
            .map_err(|e| RolloutError::storage("serialize run record", e))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| RolloutError::storage("write run record", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RolloutError::storage("rename run record", e))?;

        Ok(())
    }
}

/// Persistent store of deployment runs, keyed by run id
pub struct StatusStore {
    status_dir: PathBuf,
    runs: DashMap<String, Arc<RunSlot>>,
}

impl StatusStore {
    /// Open a store rooted at the given directory, restoring any previously
    /// persisted runs so interrupted rollouts stay inspectable
    pub fn open(status_dir: impl Into<PathBuf>) -> Result<Self> {
        let status_dir = status_dir.into();
        std::fs::create_dir_all(&status_dir)
            .map_err(|e| RolloutError::storage("create status directory", e))?;

        let store = Self {
            status_dir: status_dir.clone(),
            runs: DashMap::new(),
        };

        let entries = std::fs::read_dir(&status_dir)
            .map_err(|e| RolloutError::storage("read status directory", e))?;
        let mut restored = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::load_record(&path) {
                Ok(run) => {
                    store.runs.insert(
                        run.id.clone(),
                        Arc::new(RunSlot {
                            run: RwLock::new(run),
                            path,
                        }),
                    );
                    restored += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable run record");
                }
            }
        }

        if restored > 0 {
            info!(
                status_dir = %status_dir.display(),
                restored,
                "Restored persisted run records"
            );
        }

        Ok(store)
    }

    fn load_record(path: &Path) -> Result<DeploymentRun> {
        let bytes =
            std::fs::read(path).map_err(|e| RolloutError::storage("read run record", e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RolloutError::storage("parse run record", e))
    }

    fn slot(&self, run_id: &str) -> Result<Arc<RunSlot>> {
        self.runs
            .get(run_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RolloutError::UnknownRun {
                run_id: run_id.to_string(),
            })
    }

    /// Create a new run record with every planned component pending and
    /// persist it immediately, so partial runs are inspectable from the start
    pub async fn create(&self, run_id: &str, plan: &RolloutPlan) -> Result<DeploymentRun> {
        if self.runs.contains_key(run_id) {
            return Err(RolloutError::storage(
                "create run record",
                format!("run '{run_id}' already exists"),
            ));
        }

        let run = DeploymentRun::new(run_id, plan);
        let slot = Arc::new(RunSlot {
            run: RwLock::new(run.clone()),
            path: self.status_dir.join(format!("{run_id}.json")),
        });
        slot.persist(&run).await?;
        self.runs.insert(run_id.to_string(), slot);

        info!(
            run_id = %run_id,
            components = plan.len(),
            "📦 Created deployment run record"
        );
        Ok(run)
    }

    /// Apply a transition event to one component and durably persist the
    /// record before returning
    pub async fn transition(
        &self,
        run_id: &str,
        category: DeployCategory,
        component: &str,
        event: ComponentEvent,
    ) -> Result<ComponentStatus> {
        let slot = self.slot(run_id)?;
        let mut run = slot.run.write().await;

        let status = run.apply_event(category, component, &event)?;
        slot.persist(&run).await?;

        debug!(
            run_id = %run_id,
            category = %category,
            component = %component,
            event = event.event_type(),
            status = %status,
            "Component transition"
        );
        Ok(status)
    }

    /// Record an advisory-check failure on the run
    pub async fn record_warning(&self, run_id: &str, warning: impl Into<String>) -> Result<()> {
        let slot = self.slot(run_id)?;
        let mut run = slot.run.write().await;

        let warning = warning.into();
        warn!(run_id = %run_id, warning = %warning, "⚠️ Advisory check failure recorded");
        run.record_warning(warning);
        slot.persist(&run).await
    }

    /// Set the run's terminal status and end time
    pub async fn finalize(&self, run_id: &str, status: RunStatus) -> Result<DeploymentRun> {
        let slot = self.slot(run_id)?;
        let mut run = slot.run.write().await;

        run.finalize(status)?;
        slot.persist(&run).await?;

        info!(run_id = %run_id, status = %status, "Run finalized");
        Ok(run.clone())
    }

    /// Read the current run record
    pub async fn read(&self, run_id: &str) -> Result<DeploymentRun> {
        let slot = self.slot(run_id)?;
        let run = slot.run.read().await;
        Ok(run.clone())
    }

    /// Ids of every run the store knows about
    pub fn run_ids(&self) -> Vec<String> {
        self.runs.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plan() -> RolloutPlan {
        RolloutPlan {
            infrastructure: vec!["infra".to_string()],
            services: vec!["api".to_string()],
            platforms: vec!["shopify".to_string(), "woocommerce".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::open(dir.path()).unwrap();

        store.create("deploy-1", &plan()).await.unwrap();
        let run = store.read("deploy-1").await.unwrap();

        assert_eq!(run.id, "deploy-1");
        assert_eq!(run.components().count(), 4);
        assert_eq!(run.overall_status, RunStatus::InProgress);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::open(dir.path()).unwrap();

        store.create("deploy-1", &plan()).await.unwrap();
        assert!(store.create("deploy-1", &plan()).await.is_err());
    }

    #[tokio::test]
    async fn test_transition_persists_before_return() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::open(dir.path()).unwrap();
        store.create("deploy-1", &plan()).await.unwrap();

        store
            .transition(
                "deploy-1",
                DeployCategory::Services,
                "api",
                ComponentEvent::Start,
            )
            .await
            .unwrap();

        // Read the record straight off disk, as crash inspection would
        let raw = std::fs::read(dir.path().join("deploy-1.json")).unwrap();
        let on_disk: DeploymentRun = serde_json::from_slice(&raw).unwrap();
        assert_eq!(
            on_disk
                .component(DeployCategory::Services, "api")
                .unwrap()
                .status,
            ComponentStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_invalid_transition_is_typed_error() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::open(dir.path()).unwrap();
        store.create("deploy-1", &plan()).await.unwrap();

        let err = store
            .transition(
                "deploy-1",
                DeployCategory::Services,
                "api",
                ComponentEvent::Complete,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RolloutError::StateTransition(_)));
    }

    #[tokio::test]
    async fn test_reopen_restores_runs() {
        let dir = TempDir::new().unwrap();
        {
            let store = StatusStore::open(dir.path()).unwrap();
            store.create("deploy-1", &plan()).await.unwrap();
            store
                .transition(
                    "deploy-1",
                    DeployCategory::Infrastructure,
                    "infra",
                    ComponentEvent::Start,
                )
                .await
                .unwrap();
            store
                .transition(
                    "deploy-1",
                    DeployCategory::Infrastructure,
                    "infra",
                    ComponentEvent::Complete,
                )
                .await
                .unwrap();
        }

        let reopened = StatusStore::open(dir.path()).unwrap();
        let run = reopened.read("deploy-1").await.unwrap();
        assert_eq!(
            run.component(DeployCategory::Infrastructure, "infra")
                .unwrap()
                .status,
            ComponentStatus::Completed
        );
        // Components never started remain pending after restart
        assert_eq!(
            run.component(DeployCategory::Platforms, "shopify")
                .unwrap()
                .status,
            ComponentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_finalize_guards_and_warnings() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::open(dir.path()).unwrap();
        store.create("deploy-1", &plan()).await.unwrap();

        store
            .record_warning("deploy-1", "performance budget exceeded: p95 2.4s > 2.0s")
            .await
            .unwrap();

        // Completed is rejected while components are pending
        assert!(store
            .finalize("deploy-1", RunStatus::Completed)
            .await
            .is_err());

        let run = store.finalize("deploy-1", RunStatus::Failed).await.unwrap();
        assert_eq!(run.overall_status, RunStatus::Failed);
        assert_eq!(run.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let dir = TempDir::new().unwrap();
        let store = StatusStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.read("nope").await.unwrap_err(),
            RolloutError::UnknownRun { .. }
        ));
    }
}
