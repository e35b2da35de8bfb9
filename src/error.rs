//! # Error Types
//!
//! Structured error handling for the rollout core using thiserror for typed
//! error variants instead of `Box<dyn Error>` patterns. Fatal failure classes
//! (validation, component, health) abort the remaining pipeline; advisory
//! failures are recorded as run warnings and never surface here.

use crate::state_machine::StateMachineError;
use thiserror::Error;

/// Error taxonomy for a deployment run
#[derive(Error, Debug)]
pub enum RolloutError {
    /// Pre-flight validation failed; no deploy unit was started
    #[error("Pre-flight validation failed: {}", failures.join("; "))]
    Validation { failures: Vec<String> },

    /// A deploy unit reported failure
    #[error("Component '{component}' failed: {message}")]
    ComponentFailure { component: String, message: String },

    /// One or more endpoints stayed unhealthy after exhausting retries
    #[error("Health check failed: {unhealthy} of {total} endpoint(s) unhealthy")]
    HealthCheck { unhealthy: usize, total: usize },

    /// Illegal state transition requested on the status record
    #[error(transparent)]
    StateTransition(#[from] StateMachineError),

    /// Status record could not be read or durably written
    #[error("Status record error during {operation}: {message}")]
    Storage { operation: String, message: String },

    /// Manifest or environment configuration problem
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Delivery to a notification sink failed (always swallowed by the notifier)
    #[error("Notification delivery failed for sink '{sink}': {message}")]
    Notification { sink: String, message: String },

    /// Operation referenced a run id the store does not know
    #[error("Unknown run: {run_id}")]
    UnknownRun { run_id: String },
}

impl RolloutError {
    /// Storage error from an IO or serialization failure
    pub fn storage(operation: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: source.to_string(),
        }
    }

    /// Configuration error with the given message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RolloutError>;
