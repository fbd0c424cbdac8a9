use crate::domain::deps::normalize_dependency_edges;
use crate::types::{DepDirection, DependencyEdge, DependencyType, State, Task};
use std::collections::{HashMap, HashSet};

/// One entry of the reverse dependency index: `id` depends on the blocker
/// this index is keyed by, via `dep_type`.
#[derive(Debug, Clone)]
pub struct DependentEdge {
    pub id: String,
    pub dep_type: DependencyType,
}

/// Inverts `deps` (child -> blockers) into blocker -> dependent children, so
/// callers can look up "who depends on me" without scanning the whole map.
pub fn build_dependents_by_blocker(
    deps: &HashMap<String, Vec<DependencyEdge>>,
) -> HashMap<String, Vec<DependentEdge>> {
    let mut result: HashMap<String, Vec<DependentEdge>> = HashMap::new();
    for (child, edges) in deps {
        for edge in normalize_dependency_edges(Some(edges)) {
            result.entry(edge.blocker).or_default().push(DependentEdge {
                id: child.clone(),
                dep_type: edge.dep_type,
            });
        }
    }
    result
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DepTreeNode {
    pub task: Task,
    pub depth: u32,
    pub children: Vec<DepTreeNode>,
}

fn upstream_blockers(state: &State, task_id: &str) -> Vec<String> {
    normalize_dependency_edges(state.deps.get(task_id))
        .into_iter()
        .filter(|edge| edge.dep_type == DependencyType::Blocks)
        .map(|edge| edge.blocker)
        .collect()
}

fn downstream_blocked(state: &State, task_id: &str) -> Vec<String> {
    state
        .deps
        .iter()
        .filter(|(_, edges)| {
            normalize_dependency_edges(Some(edges))
                .iter()
                .any(|edge| edge.blocker == task_id && edge.dep_type == DependencyType::Blocks)
        })
        .map(|(child, _)| child.clone())
        .collect()
}

fn neighbors(state: &State, task_id: &str, direction: DepDirection) -> Vec<String> {
    match direction {
        DepDirection::Up => upstream_blockers(state, task_id),
        DepDirection::Down => downstream_blocked(state, task_id),
        DepDirection::Both => {
            let mut out = upstream_blockers(state, task_id);
            out.extend(downstream_blocked(state, task_id));
            out
        }
    }
}

/// Walks the dependency graph from `root` up to `max_depth` levels, guarding
/// against cycles with a per-branch visited set (`spec.md` §4.J).
pub fn build_dep_tree(
    state: &State,
    root: &str,
    direction: DepDirection,
    max_depth: u32,
) -> Option<DepTreeNode> {
    let task = state.tasks.get(root)?.clone();
    let mut visited = HashSet::new();
    visited.insert(root.to_string());
    Some(walk(state, task, direction, max_depth, 0, &mut visited))
}

fn walk(
    state: &State,
    task: Task,
    direction: DepDirection,
    max_depth: u32,
    depth: u32,
    visited: &mut HashSet<String>,
) -> DepTreeNode {
    let mut children = Vec::new();
    if depth < max_depth {
        for next_id in neighbors(state, &task.id, direction) {
            if !visited.insert(next_id.clone()) {
                continue;
            }
            if let Some(next_task) = state.tasks.get(&next_id).cloned() {
                children.push(walk(state, next_task, direction, max_depth, depth + 1, visited));
            }
            visited.remove(&next_id);
        }
    }
    DepTreeNode {
        task,
        depth,
        children,
    }
}
