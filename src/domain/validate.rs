use crate::domain::deps::normalize_dependency_edges;
use crate::errors::TsqError;
use crate::types::{DependencyType, State, Task, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningLane {
    Planning,
    Coding,
}

fn blocking_dep_ids(state: &State, task_id: &str) -> Vec<String> {
    normalize_dependency_edges(state.deps.get(task_id))
        .into_iter()
        .filter(|edge| edge.dep_type == DependencyType::Blocks)
        .map(|edge| edge.blocker)
        .collect()
}

/// Asserts that adding an edge `child -> blocker` (dep_type = blocks) would
/// not create a cycle in the blocks sub-graph (`spec.md` §3 invariant 2).
/// Detects the cycle by walking reachability from `blocker` back to `child`.
pub fn assert_no_dependency_cycle(
    state: &State,
    child: &str,
    blocker: &str,
) -> Result<(), TsqError> {
    if child == blocker {
        return Err(
            TsqError::new("DEPENDENCY_CYCLE", "a task cannot block itself", 1).with_details(
                serde_json::json!({ "child": child, "blocker": blocker }),
            ),
        );
    }
    let mut stack = vec![blocker.to_string()];
    let mut visited: HashSet<String> = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == child {
            return Err(TsqError::new(
                "DEPENDENCY_CYCLE",
                "adding this dependency would create a cycle",
                1,
            )
            .with_details(serde_json::json!({ "child": child, "blocker": blocker })));
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        for next in blocking_dep_ids(state, &current) {
            stack.push(next);
        }
    }
    Ok(())
}

/// A task is ready iff open/in_progress and every `blocks` blocker is terminal
/// (`spec.md` §4.H.1).
pub fn is_ready(state: &State, task_id: &str) -> bool {
    let Some(task) = state.tasks.get(task_id) else {
        return false;
    };
    if !matches!(task.status, TaskStatus::Open | TaskStatus::InProgress) {
        return false;
    }
    blocking_dep_ids(state, task_id).iter().all(|blocker_id| {
        state
            .tasks
            .get(blocker_id)
            .map(|blocker| matches!(blocker.status, TaskStatus::Closed | TaskStatus::Canceled))
            .unwrap_or(false)
    })
}

/// Lists ready tasks in `created_order`.
pub fn list_ready(state: &State) -> Vec<Task> {
    state
        .created_order
        .iter()
        .filter(|id| is_ready(state, id))
        .filter_map(|id| state.tasks.get(id).cloned())
        .collect()
}

/// Narrows the ready predicate to a planning lane. Tasks without a
/// `planning_state` are eligible for either lane since planning is optional
/// (`SPEC_FULL.md` §11).
pub fn list_ready_by_lane(state: &State, lane: PlanningLane) -> Vec<Task> {
    list_ready(state)
        .into_iter()
        .filter(|task| match (lane, task.planning_state) {
            (PlanningLane::Planning, Some(crate::types::PlanningState::Planned)) => false,
            (PlanningLane::Coding, Some(crate::types::PlanningState::NeedsPlanning)) => false,
            _ => true,
        })
        .collect()
}
