use crate::errors::TsqError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

const MAX_LABEL_LENGTH: usize = 64;

static LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9:_/\-]+$").expect("valid label pattern"));

/// Normalizes and validates a label against `spec.md` §3's pattern
/// (`[a-z0-9:_/-]{1..64}`), case-folded.
pub fn normalize_label(raw: &str) -> Result<String, TsqError> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(TsqError::new(
            "VALIDATION_ERROR",
            "label must not be empty",
            1,
        ));
    }
    if trimmed.len() > MAX_LABEL_LENGTH {
        return Err(TsqError::new(
            "VALIDATION_ERROR",
            format!("label must be at most {} characters", MAX_LABEL_LENGTH),
            1,
        ));
    }
    if !LABEL_PATTERN.is_match(&trimmed) {
        return Err(TsqError::new(
            "VALIDATION_ERROR",
            "label must match [a-z0-9:_/-]+",
            1,
        ));
    }
    Ok(trimmed)
}

/// Adds a label to an existing set, returning the new sorted set.
pub fn add_label(existing: &[String], raw: &str) -> Result<Vec<String>, TsqError> {
    let label = normalize_label(raw)?;
    let mut set: HashSet<String> = existing.iter().cloned().collect();
    set.insert(label);
    let mut labels: Vec<String> = set.into_iter().collect();
    labels.sort();
    Ok(labels)
}

/// Removes a label from an existing set, failing if it was not present.
pub fn remove_label(existing: &[String], raw: &str) -> Result<Vec<String>, TsqError> {
    let label = normalize_label(raw)?;
    if !existing.iter().any(|value| value == &label) {
        return Err(TsqError::new(
            "NOT_FOUND",
            format!("label {} is not set on this task", label),
            1,
        ));
    }
    let mut labels: Vec<String> = existing.iter().filter(|value| *value != &label).cloned().collect();
    labels.sort();
    Ok(labels)
}
