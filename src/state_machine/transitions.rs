//! Pure transition table for the component state machine.
//!
//! Components move pending -> in_progress -> {completed | failed}. No
//! transition skips in_progress and nothing leaves a terminal state, which
//! is what lets an interrupted run be read back unambiguously: a component
//! is either untouched, mid-flight, or done.

use super::errors::{StateMachineError, StateMachineResult};
use super::events::ComponentEvent;
use super::states::ComponentStatus;

/// Determine the target status for an event applied to the current status
pub fn next_status(
    current: ComponentStatus,
    event: &ComponentEvent,
) -> StateMachineResult<ComponentStatus> {
    let target = match (current, event) {
        (ComponentStatus::Pending, ComponentEvent::Start) => ComponentStatus::InProgress,
        (ComponentStatus::InProgress, ComponentEvent::Complete) => ComponentStatus::Completed,
        (ComponentStatus::InProgress, ComponentEvent::Fail(_)) => ComponentStatus::Failed,
        (from, event) => {
            return Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                event: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}
