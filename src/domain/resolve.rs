use crate::errors::TsqError;
use crate::types::State;

/// Resolves a user-supplied task id, accepting an unambiguous prefix unless
/// `exact_id` is set (`spec.md` §4.E).
pub fn resolve_task_id(state: &State, raw: &str, exact_id: bool) -> Result<String, TsqError> {
    if state.tasks.contains_key(raw) {
        return Ok(raw.to_string());
    }
    if exact_id {
        return Err(TsqError::new("TASK_NOT_FOUND", "Task ID not found", 1)
            .with_details(serde_json::json!({ "input": raw })));
    }

    let mut matches: Vec<&String> = state
        .tasks
        .keys()
        .filter(|id| id.starts_with(raw))
        .collect();
    matches.sort();

    match matches.len() {
        0 => Err(TsqError::new("TASK_NOT_FOUND", "Task ID not found", 1)
            .with_details(serde_json::json!({ "input": raw }))),
        1 => Ok(matches[0].clone()),
        _ => Err(TsqError::new(
            "TASK_ID_AMBIGUOUS",
            "prefix matches more than one task",
            1,
        )
        .with_details(serde_json::json!({ "input": raw, "candidates": matches }))),
    }
}
