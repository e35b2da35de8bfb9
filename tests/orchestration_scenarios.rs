//! End-to-end pipeline scenarios: full success, sequential short-circuit,
//! parallel partial failure, advisory-only failure, and validation abort.

mod common;

use common::*;
use std::sync::Arc;

use rollout_core::config::OrchestratorConfig;
use rollout_core::error::RolloutError;
use rollout_core::health::Endpoint;
use rollout_core::orchestration::{Orchestrator, RolloutRequest, RolloutStages};
use rollout_core::preflight::Preflight;
use rollout_core::state_machine::{ComponentStatus, RunStatus};
use rollout_core::store::DeployCategory;
use rollout_core::units::{DeployUnit, FnUnit};

fn quick_config() -> OrchestratorConfig {
    OrchestratorConfig {
        health_max_retries: 2,
        health_retry_delay_ms: 1,
        ..Default::default()
    }
}

fn request(stages: RolloutStages, parallel: bool) -> RolloutRequest {
    RolloutRequest {
        stages,
        health_endpoints: Vec::new(),
        integration_check: None,
        performance_check: None,
        preflight: None,
        parallel_platforms: parallel,
        report_path: None,
    }
}

fn eight_component_stages(failing_platform: Option<&str>) -> RolloutStages {
    let platform = |name: &str| -> Arc<dyn DeployUnit> {
        if failing_platform == Some(name) {
            failing_unit(name, "widget packaging exited 1")
        } else {
            ok_unit(name)
        }
    };

    RolloutStages {
        infrastructure: vec![ok_unit("infra")],
        services: vec![ok_unit("api"), ok_unit("worker"), ok_unit("admin")],
        platforms: vec![
            platform("shopify"),
            platform("woocommerce"),
            platform("magento"),
            platform("bigcommerce"),
        ],
    }
}

#[tokio::test]
async fn test_full_success_completes_every_component() {
    let (dir, store) = temp_store();
    let (notifier, delivered) = recording_notifier();
    let orchestrator = Orchestrator::new(store.clone(), quick_config(), notifier)
        .with_health_probe(Arc::new(StaticProbe { healthy: true }));

    let mut request = request(eight_component_stages(None), true);
    request.health_endpoints = vec![Endpoint {
        name: "api".to_string(),
        url: "http://localhost/healthz".to_string(),
    }];
    request.report_path = Some(report_path(&dir));

    let summary = orchestrator.run(request).await.unwrap();
    assert_eq!(summary.status, RunStatus::Completed);

    let run = store.read(&summary.run_id).await.unwrap();
    assert_eq!(run.overall_status, RunStatus::Completed);
    assert_eq!(run.components().count(), 8);
    assert!(run.all_completed());

    // Report lists all eight components as completed
    assert_eq!(summary.report.matches("| completed |").count(), 8);
    assert!(report_path(&dir).exists());

    // Exactly one notification with the terminal status
    let seen = delivered.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].status, RunStatus::Completed);
}

#[tokio::test]
async fn test_sequential_short_circuit_leaves_later_stages_pending() {
    let (dir, store) = temp_store();
    let (notifier, delivered) = recording_notifier();
    let orchestrator = Orchestrator::new(store.clone(), quick_config(), notifier);

    let stages = RolloutStages {
        infrastructure: vec![ok_unit("infra")],
        services: vec![
            ok_unit("api"),
            failing_unit("worker", "cloud deploy exited 1"),
            ok_unit("admin"),
        ],
        platforms: vec![ok_unit("shopify"), ok_unit("woocommerce")],
    };
    let mut request = request(stages, false);
    request.report_path = Some(report_path(&dir));

    let err = orchestrator.run(request).await.unwrap_err();
    assert!(matches!(err, RolloutError::ComponentFailure { ref component, .. } if component == "worker"));

    let run_id = store.run_ids().remove(0);
    let run = store.read(&run_id).await.unwrap();
    assert_eq!(run.overall_status, RunStatus::Failed);

    let status = |cat, name: &str| run.component(cat, name).unwrap().status;
    assert_eq!(status(DeployCategory::Infrastructure, "infra"), ComponentStatus::Completed);
    assert_eq!(status(DeployCategory::Services, "api"), ComponentStatus::Completed);
    assert_eq!(status(DeployCategory::Services, "worker"), ComponentStatus::Failed);
    // Service after the failure was never started
    assert_eq!(status(DeployCategory::Services, "admin"), ComponentStatus::Pending);
    // Platform stage never started at all
    assert_eq!(status(DeployCategory::Platforms, "shopify"), ComponentStatus::Pending);
    assert_eq!(status(DeployCategory::Platforms, "woocommerce"), ComponentStatus::Pending);

    // Failed runs still notify
    assert_eq!(delivered.lock().len(), 1);
    assert_eq!(delivered.lock()[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_parallel_partial_failure_records_every_terminal_state() {
    let (dir, store) = temp_store();
    let (notifier, _) = recording_notifier();
    let orchestrator = Orchestrator::new(store.clone(), quick_config(), notifier);

    let mut request = request(eight_component_stages(Some("magento")), true);
    request.report_path = Some(report_path(&dir));

    let err = orchestrator.run(request).await.unwrap_err();
    assert!(matches!(err, RolloutError::ComponentFailure { .. }));

    let run_id = store.run_ids().remove(0);
    let run = store.read(&run_id).await.unwrap();
    assert_eq!(run.overall_status, RunStatus::Failed);

    // All four platform units reached terminal states
    let platforms = &run.categories[&DeployCategory::Platforms];
    assert_eq!(platforms.len(), 4);
    assert!(platforms.values().all(|r| r.status.is_terminal()));
    assert_eq!(
        platforms
            .values()
            .filter(|r| r.status == ComponentStatus::Completed)
            .count(),
        3
    );
    assert_eq!(platforms["magento"].status, ComponentStatus::Failed);
    assert_eq!(
        platforms["magento"].error.as_deref(),
        Some("widget packaging exited 1")
    );
}

#[tokio::test]
async fn test_advisory_failure_is_recorded_but_not_fatal() {
    let (dir, store) = temp_store();
    let (notifier, delivered) = recording_notifier();
    let orchestrator = Orchestrator::new(store.clone(), quick_config(), notifier)
        .with_health_probe(Arc::new(StaticProbe { healthy: true }));

    let mut request = request(eight_component_stages(None), false);
    request.health_endpoints = vec![Endpoint {
        name: "api".to_string(),
        url: "http://localhost/healthz".to_string(),
    }];
    request.integration_check = Some(Arc::new(FnUnit::succeeding("integration-tests")));
    request.performance_check = Some(Arc::new(FnUnit::failing(
        "performance-tests",
        "p95 latency 2.4s exceeds 2.0s budget",
    )));
    request.report_path = Some(report_path(&dir));

    let summary = orchestrator.run(request).await.unwrap();
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].contains("p95 latency"));

    let run = store.read(&summary.run_id).await.unwrap();
    assert_eq!(run.overall_status, RunStatus::Completed);
    assert_eq!(run.warnings.len(), 1);

    assert!(summary.report.contains("## Warnings"));
    assert!(summary.report.contains("p95 latency"));

    assert_eq!(delivered.lock()[0].status, RunStatus::Completed);
}

#[tokio::test]
async fn test_failed_health_check_fails_the_run_after_deploys() {
    let (dir, store) = temp_store();
    let (notifier, _) = recording_notifier();
    let orchestrator = Orchestrator::new(store.clone(), quick_config(), notifier)
        .with_health_probe(Arc::new(StaticProbe { healthy: false }));

    let mut request = request(eight_component_stages(None), true);
    request.health_endpoints = vec![
        Endpoint {
            name: "api".to_string(),
            url: "http://localhost/healthz".to_string(),
        },
        Endpoint {
            name: "widget-cdn".to_string(),
            url: "http://localhost/widget.js".to_string(),
        },
    ];
    request.report_path = Some(report_path(&dir));

    let err = orchestrator.run(request).await.unwrap_err();
    assert!(matches!(
        err,
        RolloutError::HealthCheck { unhealthy: 2, total: 2 }
    ));

    // Every component deployed fine; the run still fails terminal
    let run_id = store.run_ids().remove(0);
    let run = store.read(&run_id).await.unwrap();
    assert!(run.all_completed());
    assert_eq!(run.overall_status, RunStatus::Failed);
}

#[tokio::test]
async fn test_validation_failure_aborts_before_any_unit() {
    let (dir, store) = temp_store();
    let (notifier, delivered) = recording_notifier();
    let orchestrator = Orchestrator::new(store.clone(), quick_config(), notifier);

    std::env::remove_var("ROLLOUT_SCENARIO_MISSING_VAR");
    let mut request = request(eight_component_stages(None), false);
    request.preflight = Some(Preflight::new(
        vec!["definitely-not-a-real-tool-xyz".to_string()],
        vec!["ROLLOUT_SCENARIO_MISSING_VAR".to_string()],
    ));
    request.report_path = Some(report_path(&dir));

    let err = orchestrator.run(request).await.unwrap_err();
    match err {
        RolloutError::Validation { failures } => assert_eq!(failures.len(), 2),
        other => panic!("Expected Validation, got {other:?}"),
    }

    // No deploy unit ever started; the run record still exists and is failed
    let run_id = store.run_ids().remove(0);
    let run = store.read(&run_id).await.unwrap();
    assert_eq!(run.overall_status, RunStatus::Failed);
    assert!(run
        .components()
        .all(|(_, _, record)| record.status == ComponentStatus::Pending));

    // Even an aborted run produces a report and a notification
    assert!(report_path(&dir).exists());
    assert_eq!(delivered.lock().len(), 1);
}
