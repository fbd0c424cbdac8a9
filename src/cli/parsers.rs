use crate::app::service_types::{DepDirectionFilter, ListFilter};
use crate::domain::validate::PlanningLane;
use crate::errors::TsqError;
use crate::types::{DependencyType, PlanningState, TaskKind, TaskStatus};

pub fn as_optional_string(value: Option<&str>) -> Option<String> {
    let trimmed = value.map(|value| value.trim().to_string());
    match trimmed {
        Some(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

pub fn parse_kind(raw: &str) -> Result<TaskKind, TsqError> {
    match raw {
        "task" => Ok(TaskKind::Task),
        "feature" => Ok(TaskKind::Feature),
        "epic" => Ok(TaskKind::Epic),
        _ => Err(TsqError::new(
            "VALIDATION_ERROR",
            "kind must be one of: task, feature, epic",
            1,
        )),
    }
}

pub fn parse_priority_value(raw: &str) -> Result<u8, TsqError> {
    crate::app::runtime::parse_priority(raw)
}

pub fn parse_planning_state(raw: &str) -> Result<PlanningState, TsqError> {
    match raw {
        "needs_planning" => Ok(PlanningState::NeedsPlanning),
        "planned" => Ok(PlanningState::Planned),
        _ => Err(TsqError::new(
            "VALIDATION_ERROR",
            "planning state must be one of: needs_planning, planned",
            1,
        )),
    }
}

pub fn parse_lane(raw: &str) -> Result<PlanningLane, TsqError> {
    match raw {
        "planning" => Ok(PlanningLane::Planning),
        "coding" => Ok(PlanningLane::Coding),
        _ => Err(TsqError::new(
            "VALIDATION_ERROR",
            "lane must be one of: planning, coding",
            1,
        )),
    }
}

pub fn parse_dep_type(raw: &str) -> Result<DependencyType, TsqError> {
    match raw {
        "blocks" => Ok(DependencyType::Blocks),
        "starts_after" => Ok(DependencyType::StartsAfter),
        _ => Err(TsqError::new(
            "VALIDATION_ERROR",
            "dep-type must be one of: blocks, starts_after",
            1,
        )),
    }
}

pub fn parse_dep_direction(raw: &str) -> Result<DepDirectionFilter, TsqError> {
    match raw {
        "in" => Ok(DepDirectionFilter::In),
        "out" => Ok(DepDirectionFilter::Out),
        "any" => Ok(DepDirectionFilter::Any),
        _ => Err(TsqError::new(
            "VALIDATION_ERROR",
            "dep-direction must be one of: in, out, any",
            1,
        )),
    }
}

pub fn parse_positive_int(raw: &str, field: &str, min: i64, max: i64) -> Result<i64, TsqError> {
    let value = raw.parse::<i64>().map_err(|_| {
        TsqError::new(
            "VALIDATION_ERROR",
            format!("{} must be an integer between {} and {}", field, min, max),
            1,
        )
    })?;
    if value < min || value > max {
        return Err(TsqError::new(
            "VALIDATION_ERROR",
            format!("{} must be an integer between {} and {}", field, min, max),
            1,
        ));
    }
    Ok(value)
}

pub fn parse_non_negative_int(raw: &str, field: &str) -> Result<i64, TsqError> {
    parse_positive_int(raw, field, 0, i64::MAX)
}

pub fn validate_explicit_id(raw: &str) -> Result<String, TsqError> {
    static PATTERN: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
        regex::Regex::new(r"^tsq-[0-9A-HJKMNP-TV-Z]{8}$").expect("valid explicit id pattern")
    });
    if PATTERN.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Err(TsqError::new(
            "VALIDATION_ERROR",
            "--id must match tsq-<8 Crockford base32 characters>",
            1,
        ))
    }
}

pub fn parse_status_csv(raw: &str) -> Result<Vec<TaskStatus>, TsqError> {
    raw.split(',')
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(crate::app::runtime::normalize_status)
        .collect()
}

/// Raw CLI filter flags, still strings; `parse_list_filter` is the only place
/// that turns them into a typed `ListFilter` (Service-layer filtering, not a
/// query-string parser -- `spec.md` §1 keeps that layer out of the core).
#[derive(Debug, Clone, Default)]
pub struct ListParseInput {
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub unassigned: bool,
    pub has_assignee_flag: bool,
    pub external_ref: Option<String>,
    pub discovered_from: Option<String>,
    pub kind: Option<String>,
    pub label: Option<String>,
    pub label_any: Vec<String>,
    pub created_after: Option<String>,
    pub updated_after: Option<String>,
    pub closed_after: Option<String>,
    pub ids: Vec<String>,
    pub planning: Option<String>,
    pub dep_type: Option<String>,
    pub dep_direction: Option<String>,
}

pub fn parse_list_filter(input: ListParseInput) -> Result<ListFilter, TsqError> {
    if input.unassigned && input.has_assignee_flag {
        return Err(TsqError::new(
            "VALIDATION_ERROR",
            "cannot combine --assignee with --unassigned",
            1,
        ));
    }

    let statuses = input
        .status
        .as_deref()
        .map(parse_status_csv)
        .transpose()?;
    let kind = input.kind.as_deref().map(parse_kind).transpose()?;
    let planning_state = input
        .planning
        .as_deref()
        .map(parse_planning_state)
        .transpose()?;
    let dep_type = input.dep_type.as_deref().map(parse_dep_type).transpose()?;
    let dep_direction = input
        .dep_direction
        .as_deref()
        .map(parse_dep_direction)
        .transpose()?;

    if dep_direction.is_some() && dep_type.is_none() {
        return Err(TsqError::new(
            "VALIDATION_ERROR",
            "--dep-direction requires --dep-type",
            1,
        ));
    }

    Ok(ListFilter {
        statuses,
        assignee: as_optional_string(input.assignee.as_deref()),
        external_ref: as_optional_string(input.external_ref.as_deref()),
        discovered_from: as_optional_string(input.discovered_from.as_deref()),
        kind,
        label: as_optional_string(input.label.as_deref()),
        label_any: if input.label_any.is_empty() {
            None
        } else {
            Some(input.label_any)
        },
        created_after: as_optional_string(input.created_after.as_deref()),
        updated_after: as_optional_string(input.updated_after.as_deref()),
        closed_after: as_optional_string(input.closed_after.as_deref()),
        unassigned: input.unassigned,
        ids: if input.ids.is_empty() {
            None
        } else {
            Some(input.ids)
        },
        planning_state,
        dep_type,
        dep_direction,
    })
}

pub fn apply_tree_defaults(mut filter: ListFilter, full: bool) -> ListFilter {
    if !full && filter.statuses.is_none() {
        filter.statuses = Some(vec![
            TaskStatus::Open,
            TaskStatus::InProgress,
            TaskStatus::Blocked,
            TaskStatus::Deferred,
        ]);
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_filter_rejects_assignee_and_unassigned() {
        let input = ListParseInput {
            assignee: Some("alice".to_string()),
            unassigned: true,
            has_assignee_flag: true,
            ..Default::default()
        };
        assert!(parse_list_filter(input).is_err());
    }

    #[test]
    fn parse_list_filter_rejects_dep_direction_without_dep_type() {
        let input = ListParseInput {
            dep_direction: Some("in".to_string()),
            ..Default::default()
        };
        assert!(parse_list_filter(input).is_err());
    }

    #[test]
    fn validate_explicit_id_accepts_well_formed_ids() {
        assert!(validate_explicit_id("tsq-ABCD1234").is_ok());
        assert!(validate_explicit_id("tsq-abc").is_err());
    }
}
