//! # Rollout Manifest
//!
//! The YAML document describing one product's rollout: deploy commands per
//! category, health endpoints, post-deploy checks, pre-flight requirements,
//! and notification sinks. Loaded once, validated explicitly — a malformed
//! manifest is a configuration error before anything runs, never a silent
//! fallback mid-rollout.
//!
//! ```yaml
//! project: discovery-widgets
//! preflight:
//!   required_tools: [gcloud, docker, terraform, jq]
//!   required_env: [GCP_PROJECT_ID, DEPLOY_REGION]
//!   probes:
//!     - name: gcloud-auth
//!       command: [gcloud, auth, print-access-token]
//!     - name: docker-daemon
//!       command: [docker, info]
//! infrastructure:
//!   - name: infra
//!     command: [./deploy/infra.sh, apply]
//! services:
//!   - name: api
//!     command: [./deploy/service.sh, api]
//! platforms:
//!   - name: shopify
//!     command: [./deploy/widget.sh, shopify]
//! health_endpoints:
//!   - name: api
//!     url: https://api.example.com/healthz
//! checks:
//!   integration:
//!     name: integration-tests
//!     command: [./deploy/integration.sh]
//!   performance:
//!     name: performance-tests
//!     command: [./deploy/perf.sh]
//! notifications:
//!   - name: deploys-channel
//!     webhook_url: https://chat.example.com/hooks/abc
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, RolloutError};
use crate::health::Endpoint;
use crate::notify::{LogSink, Notifier, WebhookSink};
use crate::orchestration::{RolloutRequest, RolloutStages};
use crate::preflight::{CommandProbe, Preflight};
use crate::units::{CommandUnit, DeployUnit};

/// Environment variable carrying the target version into deploy commands
pub const VERSION_ENV_VAR: &str = "ROLLOUT_VERSION";

/// One deployable component: a name and the command that ships it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Liveness probe definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub name: String,
    pub command: Vec<String>,
}

/// Pre-flight requirements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreflightSpec {
    #[serde(default)]
    pub required_tools: Vec<String>,
    #[serde(default)]
    pub required_env: Vec<String>,
    #[serde(default)]
    pub probes: Vec<ProbeSpec>,
}

/// Post-deploy check definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckSpecs {
    pub integration: Option<UnitSpec>,
    pub performance: Option<UnitSpec>,
}

/// Notification sink definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSpec {
    pub name: String,
    pub webhook_url: String,
}

/// The full rollout description for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutManifest {
    pub project: String,
    #[serde(default)]
    pub preflight: PreflightSpec,
    #[serde(default)]
    pub infrastructure: Vec<UnitSpec>,
    #[serde(default)]
    pub services: Vec<UnitSpec>,
    #[serde(default)]
    pub platforms: Vec<UnitSpec>,
    #[serde(default)]
    pub health_endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub checks: CheckSpecs,
    #[serde(default)]
    pub notifications: Vec<SinkSpec>,
}

impl RolloutManifest {
    /// Load and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading rollout manifest");

        let raw = std::fs::read_to_string(path).map_err(|e| {
            RolloutError::configuration(format!(
                "cannot read manifest '{}': {e}",
                path.display()
            ))
        })?;
        let manifest: Self = serde_yaml::from_str(&raw).map_err(|e| {
            RolloutError::configuration(format!(
                "cannot parse manifest '{}': {e}",
                path.display()
            ))
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from a YAML string
    pub fn parse(raw: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(raw).map_err(|e| {
                RolloutError::configuration(format!("cannot parse manifest: {e}"))
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(RolloutError::configuration("manifest project name is empty"));
        }

        for (category, units) in [
            ("infrastructure", &self.infrastructure),
            ("services", &self.services),
            ("platforms", &self.platforms),
        ] {
            let mut seen = std::collections::BTreeSet::new();
            for unit in units {
                if unit.name.trim().is_empty() {
                    return Err(RolloutError::configuration(format!(
                        "{category} unit with empty name"
                    )));
                }
                if unit.command.is_empty() {
                    return Err(RolloutError::configuration(format!(
                        "{category} unit '{}' has no command",
                        unit.name
                    )));
                }
                if !seen.insert(unit.name.as_str()) {
                    return Err(RolloutError::configuration(format!(
                        "duplicate {category} unit name '{}'",
                        unit.name
                    )));
                }
            }
        }

        for probe in &self.preflight.probes {
            if probe.command.is_empty() {
                return Err(RolloutError::configuration(format!(
                    "probe '{}' has no command",
                    probe.name
                )));
            }
        }

        for check in [&self.checks.integration, &self.checks.performance]
            .into_iter()
            .flatten()
        {
            if check.command.is_empty() {
                return Err(RolloutError::configuration(format!(
                    "check '{}' has no command",
                    check.name
                )));
            }
        }

        Ok(())
    }

    /// Build the orchestrator request for a target version
    pub fn to_request(
        &self,
        version: &str,
        parallel_platforms: bool,
        skip_validation: bool,
    ) -> RolloutRequest {
        let build = |specs: &[UnitSpec]| -> Vec<Arc<dyn DeployUnit>> {
            specs
                .iter()
                .map(|spec| -> Arc<dyn DeployUnit> { Arc::new(command_unit(spec, version)) })
                .collect()
        };

        let preflight = (!skip_validation).then(|| {
            let mut preflight = Preflight::new(
                self.preflight.required_tools.clone(),
                self.preflight.required_env.clone(),
            );
            for probe in &self.preflight.probes {
                preflight = preflight.with_probe(Box::new(
                    CommandProbe::new(&probe.name, &probe.command[0])
                        .args(probe.command[1..].iter().cloned()),
                ));
            }
            preflight
        });

        RolloutRequest {
            stages: RolloutStages {
                infrastructure: build(&self.infrastructure),
                services: build(&self.services),
                platforms: build(&self.platforms),
            },
            health_endpoints: self.health_endpoints.clone(),
            integration_check: self
                .checks
                .integration
                .as_ref()
                .map(|spec| -> Arc<dyn DeployUnit> { Arc::new(command_unit(spec, version)) }),
            performance_check: self
                .checks
                .performance
                .as_ref()
                .map(|spec| -> Arc<dyn DeployUnit> { Arc::new(command_unit(spec, version)) }),
            preflight,
            parallel_platforms,
            report_path: None,
        }
    }

    /// Notifier over the configured sinks, always including the log
    pub fn build_notifier(&self) -> Notifier {
        let mut notifier = Notifier::new().with_sink(Box::new(LogSink));
        for sink in &self.notifications {
            notifier = notifier.with_sink(Box::new(WebhookSink::new(&sink.name, &sink.webhook_url)));
        }
        notifier
    }
}

fn command_unit(spec: &UnitSpec, version: &str) -> CommandUnit {
    let mut unit = CommandUnit::new(&spec.name, &spec.command[0])
        .args(spec.command[1..].iter().cloned())
        .env(VERSION_ENV_VAR, version);
    for (key, value) in &spec.env {
        unit = unit.env(key, value);
    }
    unit
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
project: discovery-widgets
preflight:
  required_tools: [sh]
  required_env: [GCP_PROJECT_ID]
  probes:
    - name: docker-daemon
      command: [docker, info]
infrastructure:
  - name: infra
    command: ["./deploy/infra.sh", apply]
services:
  - name: api
    command: ["./deploy/service.sh", api]
  - name: worker
    command: ["./deploy/service.sh", worker]
    env:
      WORKER_POOL: default
platforms:
  - name: shopify
    command: ["./deploy/widget.sh", shopify]
health_endpoints:
  - name: api
    url: https://api.example.com/healthz
checks:
  performance:
    name: performance-tests
    command: ["./deploy/perf.sh"]
notifications:
  - name: deploys-channel
    webhook_url: https://chat.example.com/hooks/abc
"#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = RolloutManifest::parse(MANIFEST).unwrap();

        assert_eq!(manifest.project, "discovery-widgets");
        assert_eq!(manifest.services.len(), 2);
        assert_eq!(manifest.services[1].env["WORKER_POOL"], "default");
        assert_eq!(manifest.health_endpoints[0].name, "api");
        assert!(manifest.checks.integration.is_none());
        assert!(manifest.checks.performance.is_some());
        assert_eq!(manifest.notifications.len(), 1);
    }

    #[test]
    fn test_request_carries_stage_structure() {
        let manifest = RolloutManifest::parse(MANIFEST).unwrap();
        let request = manifest.to_request("v2.4.1", true, false);

        let plan = request.stages.plan();
        assert_eq!(plan.infrastructure, vec!["infra".to_string()]);
        assert_eq!(plan.services, vec!["api".to_string(), "worker".to_string()]);
        assert!(request.parallel_platforms);
        assert!(request.preflight.is_some());
        assert!(request.performance_check.is_some());
    }

    #[test]
    fn test_skip_validation_drops_preflight() {
        let manifest = RolloutManifest::parse(MANIFEST).unwrap();
        let request = manifest.to_request("v2.4.1", false, true);
        assert!(request.preflight.is_none());
    }

    #[test]
    fn test_duplicate_unit_name_rejected() {
        let raw = r#"
project: p
services:
  - name: api
    command: [a]
  - name: api
    command: [b]
"#;
        let err = RolloutManifest::parse(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_unit_without_command_rejected() {
        let raw = r#"
project: p
platforms:
  - name: shopify
    command: []
"#;
        let err = RolloutManifest::parse(raw).unwrap_err();
        assert!(err.to_string().contains("no command"));
    }

    #[test]
    fn test_notifier_always_has_log_sink() {
        let manifest = RolloutManifest::parse("project: p").unwrap();
        let notifier = manifest.build_notifier();
        assert_eq!(notifier.sink_count(), 1);
    }
}
