use crate::types::{DependencyEdge, DependencyType};
use std::collections::HashSet;

pub fn normalize_dependency_type(raw: &str) -> Option<DependencyType> {
    match raw {
        "blocks" => Some(DependencyType::Blocks),
        "starts_after" => Some(DependencyType::StartsAfter),
        _ => None,
    }
}

/// A unique key for a (blocker, dep_type) pair, used to de-duplicate edges.
pub fn edge_key(blocker: &str, dep_type: DependencyType) -> String {
    format!("{}\u{0}{:?}", blocker, dep_type)
}

/// Normalizes a raw edge list (which, per `spec.md` §9, may still contain
/// legacy-shaped entries on read) into a de-duplicated typed list.
pub fn normalize_dependency_edges(raw: Option<&Vec<DependencyEdge>>) -> Vec<DependencyEdge> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for edge in raw {
        let key = edge_key(&edge.blocker, edge.dep_type);
        if seen.insert(key) {
            out.push(edge.clone());
        }
    }
    out
}
