//! # State Machine Error Types
//!
//! Typed errors for illegal transitions on the status record. An illegal
//! transition is a caller bug, never a panic: the executor owns exactly one
//! component per deploy unit and must drive it pending -> in_progress ->
//! terminal.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    /// Requested status does not follow the component state machine
    #[error("Invalid transition from '{from}' on event '{event}'")]
    InvalidTransition { from: String, event: String },

    /// Run was already finalized; terminal run states never change
    #[error("Run '{run_id}' is already finalized")]
    AlreadyFinalized { run_id: String },

    /// Run cannot finalize as completed while a component is not completed
    #[error("Run '{run_id}' cannot complete: component '{component}' is {status}")]
    IncompleteRun {
        run_id: String,
        component: String,
        status: String,
    },

    /// Finalizing to a non-terminal run status makes no sense
    #[error("'{status}' is not a terminal run status")]
    NonTerminalFinalStatus { status: String },

    /// Transition referenced a component the run plan never registered
    #[error("Unknown component '{component}' in category '{category}'")]
    UnknownComponent { category: String, component: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
