// Durable run-record storage
//
// The status store is the only shared mutable resource in the system. It is
// passed by handle to every component, serializes writes per run, and
// persists each mutation before the call returns.

pub mod run;
pub mod status_store;

pub use run::{
    generate_run_id, ComponentRecord, DeployCategory, DeploymentRun, RolloutPlan,
};
pub use status_store::StatusStore;
