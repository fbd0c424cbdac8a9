use super::projector_deps_links::{apply_dep_added, apply_dep_removed, apply_link_added, apply_link_removed};
use super::projector_helpers::clone_state;
use super::projector_tasks::{
    apply_task_claimed, apply_task_created, apply_task_noted, apply_task_spec_attached,
    apply_task_status_set, apply_task_superseded, apply_task_updated,
};
use crate::errors::TsqError;
use crate::types::{EventRecord, EventType, State};

/// Applies a single event to `state`, returning the new state. Pure: never
/// touches the filesystem or the clock (`spec.md` §2).
pub fn apply(state: &State, event: &EventRecord) -> Result<State, TsqError> {
    let mut next = clone_state(state);
    match event.event_type {
        EventType::TaskCreated => apply_task_created(&mut next, event)?,
        EventType::TaskUpdated => apply_task_updated(&mut next, event)?,
        EventType::TaskStatusSet => apply_task_status_set(&mut next, event)?,
        EventType::TaskClaimed => apply_task_claimed(&mut next, event)?,
        EventType::TaskNoted => apply_task_noted(&mut next, event)?,
        EventType::TaskSpecAttached => apply_task_spec_attached(&mut next, event)?,
        EventType::TaskSuperseded => apply_task_superseded(&mut next, event)?,
        EventType::DepAdded => apply_dep_added(&mut next, event)?,
        EventType::DepRemoved => apply_dep_removed(&mut next, event)?,
        EventType::LinkAdded => apply_link_added(&mut next, event)?,
        EventType::LinkRemoved => apply_link_removed(&mut next, event)?,
    }
    next.applied_events += 1;
    Ok(next)
}

/// Folds `events` onto `initial`, stopping at the first error.
pub fn replay(initial: State, events: &[EventRecord]) -> Result<State, TsqError> {
    let mut state = initial;
    for event in events {
        state = apply(&state, event)?;
    }
    Ok(state)
}
