//! # Deploy Units
//!
//! A deploy unit is an opaque, named operation the orchestrator invokes:
//! "apply infrastructure", "ship one backend service", "package and upload
//! one storefront widget". The orchestrator never knows what a unit does —
//! cloud CLIs, secret backends, CDN uploads, and platform packaging all live
//! behind this trait. Adding a platform means adding one unit, not editing a
//! dispatch switch.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::process::Stdio;
use thiserror::Error;
use tracing::debug;

/// Diagnostic reported by a failing deploy unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UnitFailure {
    pub message: String,
}

impl UnitFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type UnitResult = Result<(), UnitFailure>;

/// An opaque deployable operation
#[async_trait]
pub trait DeployUnit: Send + Sync {
    /// Component name this unit deploys; also the key in the run record
    fn name(&self) -> &str;

    /// Run the deployment to completion, returning failure diagnostics.
    ///
    /// Implementations are expected to bound their own external calls; the
    /// executor imposes no timeout of its own.
    async fn execute(&self) -> UnitResult;
}

/// Deploy unit that shells out to an external command
///
/// The workhorse implementation: one `CommandUnit` per infrastructure apply,
/// backend service deploy, or platform packaging script. Captures a bounded
/// stderr tail as the failure diagnostic.
pub struct CommandUnit {
    name: String,
    program: String,
    args: Vec<String>,
    envs: BTreeMap<String, String>,
}

/// Longest stderr tail carried into the run record
const STDERR_TAIL_BYTES: usize = 1024;

impl CommandUnit {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            envs: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl DeployUnit for CommandUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> UnitResult {
        debug!(
            component = %self.name,
            program = %self.program,
            args = ?self.args,
            "Invoking deploy command"
        );

        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .envs(&self.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| UnitFailure::new(format!("failed to spawn '{}': {e}", self.program)))?;

        if output.status.success() {
            return Ok(());
        }

        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        Err(UnitFailure::new(format!(
            "'{}' exited {code}: {}",
            self.program,
            stderr_tail(&output.stderr)
        )))
    }
}

/// Last `STDERR_TAIL_BYTES` of captured stderr, trimmed to valid UTF-8
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        return "(no stderr output)".to_string();
    }

    let tail_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(idx, _)| trimmed.len() - idx <= STDERR_TAIL_BYTES)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    trimmed[tail_start..].to_string()
}

type UnitFn = Box<dyn Fn() -> BoxFuture<'static, UnitResult> + Send + Sync>;

/// Closure-backed deploy unit, primarily for wiring tests and in-process
/// operations that need no external command
pub struct FnUnit {
    name: String,
    f: UnitFn,
}

impl FnUnit {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, UnitResult> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }

    /// Unit that always succeeds
    pub fn succeeding(name: impl Into<String>) -> Self {
        Self::new(name, || Box::pin(async { Ok(()) }))
    }

    /// Unit that always fails with the given diagnostic
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(name, move || {
            let message = message.clone();
            Box::pin(async move { Err(UnitFailure::new(message)) })
        })
    }
}

#[async_trait]
impl DeployUnit for FnUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> UnitResult {
        (self.f)().await
    }
}
