use crate::error::{Result, RolloutError};
use std::path::PathBuf;

/// Orchestrator tuning knobs, overridable from the environment
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub status_dir: PathBuf,
    pub report_path: PathBuf,
    pub health_max_retries: u32,
    pub health_retry_delay_ms: u64,
    pub http_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            status_dir: PathBuf::from(".rollout/status"),
            report_path: PathBuf::from("deployment-report.md"),
            health_max_retries: 5,
            health_retry_delay_ms: 10_000,
            http_timeout_ms: 10_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("ROLLOUT_STATUS_DIR") {
            config.status_dir = PathBuf::from(dir);
        }

        if let Ok(path) = std::env::var("ROLLOUT_REPORT_PATH") {
            config.report_path = PathBuf::from(path);
        }

        if let Ok(retries) = std::env::var("ROLLOUT_HEALTH_MAX_RETRIES") {
            config.health_max_retries = retries.parse().map_err(|e| {
                RolloutError::configuration(format!("Invalid health_max_retries: {e}"))
            })?;
        }

        if let Ok(delay) = std::env::var("ROLLOUT_HEALTH_RETRY_DELAY_MS") {
            config.health_retry_delay_ms = delay.parse().map_err(|e| {
                RolloutError::configuration(format!("Invalid health_retry_delay_ms: {e}"))
            })?;
        }

        if let Ok(timeout) = std::env::var("ROLLOUT_HTTP_TIMEOUT_MS") {
            config.http_timeout_ms = timeout.parse().map_err(|e| {
                RolloutError::configuration(format!("Invalid http_timeout_ms: {e}"))
            })?;
        }

        Ok(config)
    }
}
