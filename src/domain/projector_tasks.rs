use super::projector_helpers::{
    as_bool, as_planning_state, as_priority, as_string, as_string_array, as_task_kind,
    as_task_status, event_id_value, event_identifier, require_task, require_task_mut,
    set_child_counter, set_task_closed_state,
};
use crate::errors::TsqError;
use crate::types::{EventRecord, State, Task, TaskNote, TaskStatus};

fn invalid_event(message: impl Into<String>, event: &EventRecord) -> TsqError {
    TsqError::new("INVALID_EVENT", message, 1)
        .with_details(serde_json::json!({ "event_id": event_id_value(event) }))
}

pub(crate) fn apply_task_created(state: &mut State, event: &EventRecord) -> Result<(), TsqError> {
    let payload = &event.payload;
    let title = as_string(payload.get("title")).filter(|value| !value.trim().is_empty());
    let Some(title) = title else {
        return Err(invalid_event("task.created requires a non-empty title", event));
    };

    if let Some(parent_id) = as_string(payload.get("parent_id")) {
        require_task(state, &parent_id)?;
    }

    let task = Task {
        id: event.task_id.clone(),
        kind: as_task_kind(payload.get("kind")).unwrap_or(crate::types::TaskKind::Task),
        title,
        description: as_string(payload.get("description")),
        notes: Vec::new(),
        status: crate::types::TaskStatus::Open,
        priority: as_priority(payload.get("priority"))?.unwrap_or(1),
        assignee: as_string(payload.get("assignee")),
        parent_id: as_string(payload.get("parent_id")),
        labels: as_string_array(payload.get("labels")).unwrap_or_default(),
        external_ref: as_string(payload.get("external_ref")),
        discovered_from: as_string(payload.get("discovered_from")),
        superseded_by: None,
        duplicate_of: None,
        replies_to: None,
        spec_path: None,
        spec_fingerprint: None,
        spec_attached_at: None,
        spec_attached_by: None,
        planning_state: as_planning_state(payload.get("planning_state")),
        created_at: event.ts.clone(),
        updated_at: event.ts.clone(),
        closed_at: None,
    };

    if state.tasks.contains_key(&event.task_id) {
        return Err(TsqError::new(
            "TASK_EXISTS",
            format!("task {} already exists", event.task_id),
            1,
        ));
    }

    set_child_counter(state, &event.task_id);
    state.tasks.insert(event.task_id.clone(), task);
    state.created_order.push(event.task_id.clone());
    Ok(())
}

pub(crate) fn apply_task_updated(state: &mut State, event: &EventRecord) -> Result<(), TsqError> {
    let payload = &event.payload;
    let clear_description = as_bool(payload.get("clear_description"));
    let clear_external_ref = as_bool(payload.get("clear_external_ref"));
    let clear_discovered_from = as_bool(payload.get("clear_discovered_from"));

    let description = as_string(payload.get("description"));
    let external_ref = as_string(payload.get("external_ref"));
    let discovered_from = as_string(payload.get("discovered_from"));

    if description.is_some() && clear_description {
        return Err(invalid_event(
            "cannot combine description with clear_description",
            event,
        ));
    }
    if external_ref.is_some() && clear_external_ref {
        return Err(invalid_event(
            "cannot combine external_ref with clear_external_ref",
            event,
        ));
    }
    if discovered_from.is_some() && clear_discovered_from {
        return Err(invalid_event(
            "cannot combine discovered_from with clear_discovered_from",
            event,
        ));
    }

    if let Some(title) = as_string(payload.get("title"))
        && title.trim().is_empty()
    {
        return Err(invalid_event("title must not be empty", event));
    }

    let duplicate_of = as_string(payload.get("duplicate_of"));
    if let Some(duplicate_of) = duplicate_of.as_ref() {
        if duplicate_of == &event.task_id {
            return Err(invalid_event("duplicate_of must not reference itself", event));
        }
        require_task(state, duplicate_of)?;
    }

    let task = require_task_mut(state, &event.task_id)?;

    if let Some(title) = as_string(payload.get("title")) {
        task.title = title;
    }
    if let Some(kind) = as_task_kind(payload.get("kind")) {
        task.kind = kind;
    }
    if let Some(priority) = as_priority(payload.get("priority"))? {
        task.priority = priority;
    }
    if let Some(assignee) = as_string(payload.get("assignee")) {
        task.assignee = Some(assignee);
    }
    if let Some(labels) = as_string_array(payload.get("labels")) {
        task.labels = labels;
    }
    if let Some(description) = description {
        task.description = Some(description);
    } else if clear_description {
        task.description = None;
    }
    if let Some(external_ref) = external_ref {
        task.external_ref = Some(external_ref);
    } else if clear_external_ref {
        task.external_ref = None;
    }
    if let Some(discovered_from) = discovered_from {
        task.discovered_from = Some(discovered_from);
    } else if clear_discovered_from {
        task.discovered_from = None;
    }
    if let Some(duplicate_of) = duplicate_of {
        task.duplicate_of = Some(duplicate_of);
    }
    task.updated_at = event.ts.clone();
    Ok(())
}

pub(crate) fn apply_task_status_set(
    state: &mut State,
    event: &EventRecord,
) -> Result<(), TsqError> {
    let payload = &event.payload;
    let Some(status) = as_task_status(payload.get("status")) else {
        return Err(invalid_event("task.status_set requires a valid status", event));
    };

    let task = require_task_mut(state, &event.task_id)?;
    if matches!(task.status, TaskStatus::Closed | TaskStatus::Canceled)
        && status == TaskStatus::InProgress
    {
        return Err(TsqError::new(
            "INVALID_TRANSITION",
            format!("{} cannot move from {:?} to in_progress", event.task_id, task.status),
            1,
        ));
    }

    set_task_closed_state(task, status, &event.ts);
    task.updated_at = event.ts.clone();
    Ok(())
}

pub(crate) fn apply_task_claimed(state: &mut State, event: &EventRecord) -> Result<(), TsqError> {
    let payload = &event.payload;
    let assignee = as_string(payload.get("assignee")).unwrap_or_else(|| event.actor.clone());

    let task = require_task_mut(state, &event.task_id)?;
    if matches!(task.status, TaskStatus::Closed | TaskStatus::Canceled) {
        return Err(TsqError::new(
            "INVALID_STATUS",
            format!("{} cannot be claimed while {:?}", event.task_id, task.status),
            1,
        ));
    }
    if task.assignee.is_some() && task.assignee.as_deref() != Some(assignee.as_str()) {
        return Err(TsqError::new(
            "CLAIM_CONFLICT",
            format!("{} is already assigned", event.task_id),
            1,
        ));
    }

    task.assignee = Some(assignee);
    if task.status == TaskStatus::Open {
        task.status = TaskStatus::InProgress;
    }
    task.updated_at = event.ts.clone();
    Ok(())
}

pub(crate) fn apply_task_noted(state: &mut State, event: &EventRecord) -> Result<(), TsqError> {
    let payload = &event.payload;
    let Some(text) = as_string(payload.get("text")).filter(|value| !value.trim().is_empty())
    else {
        return Err(invalid_event("task.noted requires non-empty text", event));
    };
    let event_id = event_identifier(event)?;
    let task = require_task_mut(state, &event.task_id)?;
    task.notes.push(TaskNote {
        event_id,
        ts: event.ts.clone(),
        actor: event.actor.clone(),
        text,
    });
    task.updated_at = event.ts.clone();
    Ok(())
}

pub(crate) fn apply_task_spec_attached(
    state: &mut State,
    event: &EventRecord,
) -> Result<(), TsqError> {
    let payload = &event.payload;
    let (Some(spec_path), Some(spec_fingerprint)) = (
        as_string(payload.get("spec_path")),
        as_string(payload.get("spec_fingerprint")),
    ) else {
        return Err(invalid_event(
            "task.spec_attached requires spec_path and spec_fingerprint",
            event,
        ));
    };
    let attached_at = as_string(payload.get("spec_attached_at")).unwrap_or_else(|| event.ts.clone());
    let attached_by = as_string(payload.get("spec_attached_by")).unwrap_or_else(|| event.actor.clone());

    let task = require_task_mut(state, &event.task_id)?;
    task.spec_path = Some(spec_path);
    task.spec_fingerprint = Some(spec_fingerprint);
    task.spec_attached_at = Some(attached_at);
    task.spec_attached_by = Some(attached_by);
    task.updated_at = event.ts.clone();
    Ok(())
}

pub(crate) fn apply_task_superseded(
    state: &mut State,
    event: &EventRecord,
) -> Result<(), TsqError> {
    let payload = &event.payload;
    let Some(with) = as_string(payload.get("with")) else {
        return Err(invalid_event("task.superseded requires with", event));
    };
    if with == event.task_id {
        return Err(invalid_event("a task cannot supersede itself", event));
    }
    require_task(state, &with)?;

    let task = require_task_mut(state, &event.task_id)?;
    task.superseded_by = Some(with);
    set_task_closed_state(task, TaskStatus::Closed, &event.ts);
    task.updated_at = event.ts.clone();
    Ok(())
}
