//! # Pre-flight Validation
//!
//! Prerequisite checks that run before any deploy unit: required external
//! tools resolvable on PATH, required environment values present and
//! non-empty, and pluggable liveness probes for the deployment target's
//! auth/session state and the local execution daemon. Every failed check is
//! aggregated so the caller can report everything to fix at once.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, RolloutError};

/// One failed pre-flight check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub check: String,
    pub detail: String,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.check, self.detail)
    }
}

/// Aggregate result of a validation pass; lists every failure, not the first
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub failures: Vec<ValidationFailure>,
    pub checks_run: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, check: impl Into<String>, detail: impl Into<String>) {
        self.failures.push(ValidationFailure {
            check: check.into(),
            detail: detail.into(),
        });
    }

    /// Convert a failed report into the fatal validation error
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(RolloutError::Validation {
                failures: self.failures.iter().map(ToString::to_string).collect(),
            })
        }
    }
}

/// Boolean liveness probe against an external system (target auth session,
/// local container daemon). Kept pluggable so the core stays decoupled from
/// the specific cloud or runtime in use.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    fn name(&self) -> &str;

    /// Ok when the probed system is alive, Err with a diagnostic otherwise
    async fn probe(&self) -> std::result::Result<(), String>;
}

/// Liveness probe that runs a command and treats exit status 0 as alive
/// (e.g. `gcloud auth print-access-token`, `docker info`)
pub struct CommandProbe {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandProbe {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl LivenessProbe for CommandProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> std::result::Result<(), String> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map_err(|e| format!("failed to run '{}': {e}", self.program))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("'{}' exited non-zero", self.program))
        }
    }
}

/// Pre-flight validator; tool and env var names come from configuration,
/// never hardcoded in the core
#[derive(Default)]
pub struct Preflight {
    required_tools: Vec<String>,
    required_env: Vec<String>,
    probes: Vec<Box<dyn LivenessProbe>>,
}

impl Preflight {
    pub fn new(
        required_tools: impl IntoIterator<Item = String>,
        required_env: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            required_tools: required_tools.into_iter().collect(),
            required_env: required_env.into_iter().collect(),
            probes: Vec::new(),
        }
    }

    pub fn with_probe(mut self, probe: Box<dyn LivenessProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Run every check, aggregating all failures
    pub async fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for tool in &self.required_tools {
            report.checks_run += 1;
            if !tool_on_path(tool) {
                report.record(format!("tool '{tool}'"), "not found on PATH");
            }
        }

        for var in &self.required_env {
            report.checks_run += 1;
            match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => {}
                Ok(_) => report.record(format!("env '{var}'"), "set but empty"),
                Err(_) => report.record(format!("env '{var}'"), "not set"),
            }
        }

        for probe in &self.probes {
            report.checks_run += 1;
            debug!(probe = probe.name(), "Running liveness probe");
            if let Err(detail) = probe.probe().await {
                report.record(format!("probe '{}'", probe.name()), detail);
            }
        }

        if report.is_ok() {
            info!(checks = report.checks_run, "✅ Pre-flight validation passed");
        } else {
            info!(
                checks = report.checks_run,
                failed = report.failures.len(),
                "Pre-flight validation failed"
            );
        }
        report
    }
}

/// Resolve a tool name against PATH the way the shell would
fn tool_on_path(tool: &str) -> bool {
    // An explicit path bypasses PATH resolution
    if tool.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(Path::new(tool));
    }

    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| is_executable(&dir.join(tool)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
