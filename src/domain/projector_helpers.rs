use crate::domain::deps::normalize_dependency_edges;
use crate::errors::TsqError;
use crate::types::{
    EventRecord, PlanningState, RelationType, State, Task, TaskKind, TaskStatus,
};
use serde_json::Value;
use std::collections::HashSet;

pub(crate) fn as_string(value: Option<&Value>) -> Option<String> {
    value.and_then(|value| value.as_str()).map(str::to_string)
}

pub(crate) fn as_string_array(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(|value| value.as_array()).map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    })
}

pub(crate) fn as_bool(value: Option<&Value>) -> bool {
    value.and_then(|value| value.as_bool()).unwrap_or(false)
}

pub(crate) fn as_priority(value: Option<&Value>) -> Result<Option<u8>, TsqError> {
    let Some(value) = value else { return Ok(None) };
    let Some(raw) = value.as_u64() else {
        return Err(TsqError::new(
            "INVALID_EVENT",
            "priority must be an integer between 0 and 3",
            1,
        ));
    };
    if raw > 3 {
        return Err(TsqError::new(
            "INVALID_EVENT",
            "priority must be an integer between 0 and 3",
            1,
        ));
    }
    Ok(Some(raw as u8))
}

pub(crate) fn as_task_kind(value: Option<&Value>) -> Option<TaskKind> {
    match value.and_then(|value| value.as_str()) {
        Some("task") => Some(TaskKind::Task),
        Some("feature") => Some(TaskKind::Feature),
        Some("epic") => Some(TaskKind::Epic),
        _ => None,
    }
}

pub(crate) fn as_task_status(value: Option<&Value>) -> Option<TaskStatus> {
    match value.and_then(|value| value.as_str()) {
        Some("open") => Some(TaskStatus::Open),
        Some("in_progress") => Some(TaskStatus::InProgress),
        Some("blocked") => Some(TaskStatus::Blocked),
        Some("closed") => Some(TaskStatus::Closed),
        Some("canceled") => Some(TaskStatus::Canceled),
        Some("deferred") => Some(TaskStatus::Deferred),
        _ => None,
    }
}

pub(crate) fn as_planning_state(value: Option<&Value>) -> Option<PlanningState> {
    match value.and_then(|value| value.as_str()) {
        Some("needs_planning") => Some(PlanningState::NeedsPlanning),
        Some("planned") => Some(PlanningState::Planned),
        _ => None,
    }
}

pub(crate) fn as_relation_type(value: Option<&Value>) -> Option<RelationType> {
    match value.and_then(|value| value.as_str()) {
        Some("relates_to") => Some(RelationType::RelatesTo),
        Some("replies_to") => Some(RelationType::RepliesTo),
        Some("duplicates") => Some(RelationType::Duplicates),
        Some("supersedes") => Some(RelationType::Supersedes),
        _ => None,
    }
}

pub(crate) fn event_identifier(event: &EventRecord) -> Result<String, TsqError> {
    event
        .id
        .clone()
        .or_else(|| event.event_id.clone())
        .ok_or_else(|| TsqError::new("INVALID_EVENT", "event is missing an id", 1))
}

pub(crate) fn event_id_value(event: &EventRecord) -> Value {
    event
        .id
        .clone()
        .or_else(|| event.event_id.clone())
        .map(Value::String)
        .unwrap_or(Value::Null)
}

/// Deep-clones state, normalizing every dependency edge list on the way so
/// the in-memory representation is always the typed form.
pub(crate) fn clone_state(state: &State) -> State {
    let mut next = state.clone();
    for edges in next.deps.values_mut() {
        *edges = normalize_dependency_edges(Some(edges));
    }
    next
}

/// Updates `child_counters[parent]` if `task_id` looks like `${parent}.${N}`
/// with an integer `N` greater than the counter's current value
/// (`spec.md` §3 invariant 4).
pub(crate) fn set_child_counter(state: &mut State, task_id: &str) {
    let Some((parent, suffix)) = task_id.rsplit_once('.') else {
        return;
    };
    let Ok(n) = suffix.parse::<u64>() else {
        return;
    };
    let entry = state.child_counters.entry(parent.to_string()).or_insert(0);
    if n > *entry {
        *entry = n;
    }
}

pub(crate) fn set_task_closed_state(task: &mut Task, status: TaskStatus, ts: &str) {
    task.status = status;
    if status == TaskStatus::Closed {
        task.closed_at = Some(ts.to_string());
    } else {
        task.closed_at = None;
    }
}

pub(crate) fn upsert_directed_link(
    links: &mut std::collections::HashMap<String, std::collections::HashMap<RelationType, HashSet<String>>>,
    src: &str,
    dst: &str,
    rel_type: RelationType,
) {
    links
        .entry(src.to_string())
        .or_default()
        .entry(rel_type)
        .or_default()
        .insert(dst.to_string());
}

pub(crate) fn remove_directed_link(
    links: &mut std::collections::HashMap<String, std::collections::HashMap<RelationType, HashSet<String>>>,
    src: &str,
    dst: &str,
    rel_type: RelationType,
) {
    if let Some(by_type) = links.get_mut(src)
        && let Some(targets) = by_type.get_mut(&rel_type)
    {
        targets.remove(dst);
    }
}

pub(crate) fn require_task<'a>(state: &'a State, task_id: &str) -> Result<&'a Task, TsqError> {
    state.tasks.get(task_id).ok_or_else(|| {
        TsqError::new("TASK_NOT_FOUND", "Task ID not found", 1)
            .with_details(serde_json::json!({ "input": task_id }))
    })
}

pub(crate) fn require_task_mut<'a>(
    state: &'a mut State,
    task_id: &str,
) -> Result<&'a mut Task, TsqError> {
    state.tasks.get_mut(task_id).ok_or_else(|| {
        TsqError::new("TASK_NOT_FOUND", "Task ID not found", 1)
            .with_details(serde_json::json!({ "input": task_id }))
    })
}
