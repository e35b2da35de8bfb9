//! Shared helpers for integration and property tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use rollout_core::health::{Endpoint, HealthProbe};
use rollout_core::notify::{Notification, NotificationSink, Notifier};
use rollout_core::store::StatusStore;
use rollout_core::units::{DeployUnit, FnUnit};

/// Deploy unit that always succeeds
pub fn ok_unit(name: &str) -> Arc<dyn DeployUnit> {
    Arc::new(FnUnit::succeeding(name))
}

/// Deploy unit that always fails with the given diagnostic
pub fn failing_unit(name: &str, message: &str) -> Arc<dyn DeployUnit> {
    Arc::new(FnUnit::failing(name, message))
}

/// Health probe with a fixed verdict
pub struct StaticProbe {
    pub healthy: bool,
}

#[async_trait]
impl HealthProbe for StaticProbe {
    async fn probe(&self, _endpoint: &Endpoint) -> Result<(), String> {
        if self.healthy {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }
}

/// Notification sink that records everything it is handed
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub delivered: Arc<Mutex<Vec<Notification>>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), String> {
        self.delivered.lock().push(notification.clone());
        Ok(())
    }
}

/// Notifier wired to a recording sink, plus the recorded deliveries
pub fn recording_notifier() -> (Notifier, Arc<Mutex<Vec<Notification>>>) {
    let sink = RecordingSink::default();
    let delivered = sink.delivered.clone();
    (Notifier::new().with_sink(Box::new(sink)), delivered)
}

/// Fresh status store rooted in a temp directory
pub fn temp_store() -> (TempDir, Arc<StatusStore>) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(StatusStore::open(dir.path().join("status")).unwrap());
    (dir, store)
}

/// Report path inside a temp directory
pub fn report_path(dir: &TempDir) -> PathBuf {
    dir.path().join("deployment-report.md")
}
