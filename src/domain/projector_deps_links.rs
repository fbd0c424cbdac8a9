use super::projector_helpers::{
    as_relation_type, as_string, event_id_value, remove_directed_link, require_task,
    upsert_directed_link,
};
use crate::domain::deps::normalize_dependency_edges;
use crate::domain::validate::assert_no_dependency_cycle;
use crate::errors::TsqError;
use crate::types::{DependencyEdge, DependencyType, EventRecord, RelationType, State};

fn invalid_event(message: impl Into<String>, event: &EventRecord) -> TsqError {
    TsqError::new("INVALID_EVENT", message, 1)
        .with_details(serde_json::json!({ "event_id": event_id_value(event) }))
}

fn normalize_dependency_type(raw: &str) -> Option<DependencyType> {
    crate::domain::deps::normalize_dependency_type(raw)
}

pub(crate) fn apply_dep_added(state: &mut State, event: &EventRecord) -> Result<(), TsqError> {
    let payload = &event.payload;
    let Some(blocker) = as_string(payload.get("blocker")) else {
        return Err(invalid_event("dep.added requires a blocker", event));
    };
    let dep_type = as_string(payload.get("dep_type"))
        .and_then(|raw| normalize_dependency_type(&raw))
        .unwrap_or(DependencyType::Blocks);

    require_task(state, &event.task_id)?;
    require_task(state, &blocker)?;

    if dep_type == DependencyType::Blocks {
        assert_no_dependency_cycle(state, &event.task_id, &blocker)?;
    }

    let edges = state.deps.entry(event.task_id.clone()).or_default();
    let mut normalized = normalize_dependency_edges(Some(edges));
    if !normalized
        .iter()
        .any(|edge| edge.blocker == blocker && edge.dep_type == dep_type)
    {
        normalized.push(DependencyEdge {
            blocker,
            dep_type,
        });
    }
    *edges = normalized;
    Ok(())
}

pub(crate) fn apply_dep_removed(state: &mut State, event: &EventRecord) -> Result<(), TsqError> {
    let payload = &event.payload;
    let Some(blocker) = as_string(payload.get("blocker")) else {
        return Err(invalid_event("dep.removed requires a blocker", event));
    };
    let dep_type = as_string(payload.get("dep_type")).and_then(|raw| normalize_dependency_type(&raw));

    if let Some(edges) = state.deps.get_mut(&event.task_id) {
        let normalized = normalize_dependency_edges(Some(edges));
        *edges = normalized
            .into_iter()
            .filter(|edge| {
                !(edge.blocker == blocker && dep_type.is_none_or(|dt| edge.dep_type == dt))
            })
            .collect();
    }
    Ok(())
}

pub(crate) fn apply_link_added(state: &mut State, event: &EventRecord) -> Result<(), TsqError> {
    let payload = &event.payload;
    let Some(dst) = as_string(payload.get("target")) else {
        return Err(invalid_event("link.added requires a target", event));
    };
    let Some(rel_type) = as_relation_type(payload.get("type")) else {
        return Err(invalid_event("link.added requires a valid type", event));
    };

    if dst == event.task_id {
        return Err(TsqError::new(
            "RELATION_SELF_EDGE",
            "a task cannot relate to itself",
            1,
        )
        .with_details(serde_json::json!({ "task_id": event.task_id })));
    }
    require_task(state, &event.task_id)?;
    require_task(state, &dst)?;

    if rel_type == RelationType::Duplicates {
        assert_no_duplicate_cycle(state, &event.task_id, &dst)?;
    }

    upsert_directed_link(&mut state.links, &event.task_id, &dst, rel_type);
    if rel_type == RelationType::RelatesTo {
        upsert_directed_link(&mut state.links, &dst, &event.task_id, rel_type);
    }
    Ok(())
}

pub(crate) fn apply_link_removed(state: &mut State, event: &EventRecord) -> Result<(), TsqError> {
    let payload = &event.payload;
    let Some(dst) = as_string(payload.get("target")) else {
        return Err(invalid_event("link.removed requires a target", event));
    };
    let Some(rel_type) = as_relation_type(payload.get("type")) else {
        return Err(invalid_event("link.removed requires a valid type", event));
    };

    remove_directed_link(&mut state.links, &event.task_id, &dst, rel_type);
    if rel_type == RelationType::RelatesTo {
        remove_directed_link(&mut state.links, &dst, &event.task_id, rel_type);
    }
    Ok(())
}

/// Walks the `duplicates` sub-graph from `dst` back to `child` to keep the
/// chain acyclic (`spec.md` §3 invariant 3).
fn assert_no_duplicate_cycle(state: &State, child: &str, dst: &str) -> Result<(), TsqError> {
    let mut stack = vec![dst.to_string()];
    let mut visited = std::collections::HashSet::new();
    while let Some(current) = stack.pop() {
        if current == child {
            return Err(TsqError::new(
                "DUPLICATE_CYCLE",
                "this duplicate link would create a cycle",
                1,
            )
            .with_details(serde_json::json!({ "child": child, "dst": dst })));
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Some(by_type) = state.links.get(&current)
            && let Some(targets) = by_type.get(&RelationType::Duplicates)
        {
            stack.extend(targets.iter().cloned());
        }
    }
    Ok(())
}
