use crate::app::service_query::ShowResult;
use crate::app::service_types::{HistoryResult, LabelCount, MergeResult, OrphansResult};
use crate::domain::dep_tree::DepTreeNode;
use crate::types::{
    DependencyType, PlanningState, RelationType, RepairResult, Task, TaskKind, TaskNote,
    TaskStatus, TaskTreeNode,
};

pub fn status_to_string(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Open => "open",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Blocked => "blocked",
        TaskStatus::Closed => "closed",
        TaskStatus::Canceled => "canceled",
        TaskStatus::Deferred => "deferred",
    }
}

fn task_kind_to_string(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Task => "task",
        TaskKind::Feature => "feature",
        TaskKind::Epic => "epic",
    }
}

fn planning_state_to_string(state: PlanningState) -> &'static str {
    match state {
        PlanningState::NeedsPlanning => "needs_planning",
        PlanningState::Planned => "planned",
    }
}

fn dep_type_to_string(dep_type: DependencyType) -> &'static str {
    match dep_type {
        DependencyType::Blocks => "blocks",
        DependencyType::StartsAfter => "starts_after",
    }
}

fn relation_type_to_string(rel_type: RelationType) -> &'static str {
    match rel_type {
        RelationType::RelatesTo => "relates_to",
        RelationType::RepliesTo => "replies_to",
        RelationType::Duplicates => "duplicates",
        RelationType::Supersedes => "supersedes",
    }
}

pub fn print_task_list(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("no tasks");
        return;
    }
    println!("ID\tP\tKIND\tSTATUS\tASSIGNEE\tTITLE");
    for task in tasks {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            task.id,
            task.priority,
            task_kind_to_string(task.kind),
            status_to_string(task.status),
            task.assignee.as_deref().unwrap_or("-"),
            task.title
        );
    }
}

pub fn print_task(task: &Task) {
    println!("{} {}", task.id, task.title);
    println!(
        "kind={} status={} priority={}",
        task_kind_to_string(task.kind),
        status_to_string(task.status),
        task.priority
    );
    if let Some(planning_state) = task.planning_state {
        println!("planning={}", planning_state_to_string(planning_state));
    }
    if let Some(assignee) = &task.assignee {
        println!("assignee={}", assignee);
    }
    if let Some(external_ref) = &task.external_ref {
        println!("external_ref={}", external_ref);
    }
    if let Some(discovered_from) = &task.discovered_from {
        println!("discovered_from={}", discovered_from);
    }
    if let Some(parent) = &task.parent_id {
        println!("parent={}", parent);
    }
    if !task.labels.is_empty() {
        println!("labels={}", task.labels.join(","));
    }
    if let Some(superseded_by) = &task.superseded_by {
        println!("superseded_by={}", superseded_by);
    }
    if let Some(duplicate_of) = &task.duplicate_of {
        println!("duplicate_of={}", duplicate_of);
    }
    if let Some(description) = &task.description {
        println!("description={}", description);
    }
    println!("notes={}", task.notes.len());
    if let (Some(spec_path), Some(spec_fingerprint)) = (&task.spec_path, &task.spec_fingerprint) {
        println!("spec={} sha256={}", spec_path, spec_fingerprint);
    }
}

pub fn print_show_result(data: &ShowResult) {
    print_task(&data.task);
    if !data.blocker_edges.is_empty() {
        let blockers = data
            .blocker_edges
            .iter()
            .map(|edge| format!("{}({})", edge.id, dep_type_to_string(edge.dep_type)))
            .collect::<Vec<_>>();
        println!("blockers={}", blockers.join(","));
    }
    if !data.dependent_edges.is_empty() {
        let dependents = data
            .dependent_edges
            .iter()
            .map(|edge| format!("{}({})", edge.id, dep_type_to_string(edge.dep_type)))
            .collect::<Vec<_>>();
        println!("dependents={}", dependents.join(","));
    }
    println!("ready={}", data.ready);
    if !data.links.is_empty() {
        for (rel, ids) in &data.links {
            let mut sorted: Vec<&String> = ids.iter().collect();
            sorted.sort();
            println!(
                "link:{}={}",
                rel,
                sorted
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            );
        }
    }
    if !data.history.is_empty() {
        println!("history_events={}", data.history.len());
    }
}

pub fn print_task_tree(nodes: &[TaskTreeNode]) {
    if nodes.is_empty() {
        println!("no tasks");
        return;
    }
    for node in nodes {
        print_tree_node(node, 0);
    }
}

fn print_tree_node(node: &TaskTreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{}{} [{}] {}",
        indent,
        node.task.id,
        status_to_string(node.task.status),
        node.task.title
    );
    if !node.blocker_edges.is_empty() {
        let blockers = node
            .blocker_edges
            .iter()
            .map(|edge| format!("{}:{}", edge.id, dep_type_to_string(edge.dep_type)))
            .collect::<Vec<_>>()
            .join(",");
        println!("{}  blocks-on={}", indent, blockers);
    }
    for child in &node.children {
        print_tree_node(child, depth + 1);
    }
}

pub fn print_dep_tree_result(root: &DepTreeNode) {
    print_dep_node(root, 0);
}

fn print_dep_node(node: &DepTreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{}{} [{}] {}",
        indent,
        node.task.id,
        status_to_string(node.task.status),
        node.task.title
    );
    for child in &node.children {
        print_dep_node(child, depth + 1);
    }
}

pub fn print_repair_result(result: &RepairResult) {
    println!(
        "mode={}",
        if result.applied {
            "applied"
        } else {
            "dry-run (use --fix to apply)"
        }
    );
    println!(
        "orphaned_deps={}{}",
        result.plan.orphaned_deps.len(),
        if result.applied { " (removed)" } else { "" }
    );
    for dep in &result.plan.orphaned_deps {
        println!(
            "  {} -> {} ({})",
            dep.child,
            dep.blocker,
            dep_type_to_string(dep.dep_type)
        );
    }
    println!(
        "orphaned_links={}{}",
        result.plan.orphaned_links.len(),
        if result.applied { " (removed)" } else { "" }
    );
    for link in &result.plan.orphaned_links {
        println!(
            "  {} -[{}]-> {}",
            link.src,
            relation_type_to_string(link.rel_type),
            link.dst
        );
    }
    println!(
        "stale_temp_files={}{}",
        result.plan.stale_temp_files.len(),
        if result.applied { " (deleted)" } else { "" }
    );
    println!("lock_present={}", result.plan.lock_present);
    println!(
        "excess_snapshots={}{}",
        result.plan.excess_snapshots.len(),
        if result.applied && !result.plan.excess_snapshots.is_empty() {
            " (pruned, kept last 5)"
        } else {
            ""
        }
    );
    if result.applied {
        println!("events_appended={}", result.events_appended);
        println!("files_removed={}", result.files_removed);
    }
}

pub fn print_merge_result(result: &MergeResult) {
    if result.dry_run {
        println!("mode=dry-run (use without --dry-run to apply)");
    }
    println!(
        "target={} \"{}\" [{}]",
        result.target.id, result.target.title, result.target.status
    );
    if let Some(summary) = &result.plan_summary {
        println!(
            "plan=requested:{} merged:{} skipped:{} events:{}",
            summary.requested_sources,
            summary.merged_sources,
            summary.skipped_sources,
            summary.planned_events
        );
    }
    println!("merged={}", result.merged.len());
    for merged in &result.merged {
        println!("  {} -> {}", merged.id, merged.status);
    }
    if let Some(projected) = &result.projected {
        println!(
            "projected_target={} [{}]",
            projected.target.id,
            status_to_string(projected.target.status)
        );
        for source in &projected.sources {
            println!(
                "  projected_source={} [{}] duplicate_of={}",
                source.id,
                status_to_string(source.status),
                source.duplicate_of.as_deref().unwrap_or("-")
            );
        }
    }
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
}

pub fn print_history(data: &HistoryResult) {
    if data.events.is_empty() {
        println!("no events");
        return;
    }
    for event in &data.events {
        let event_id = event
            .id
            .as_ref()
            .or(event.event_id.as_ref())
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{} {} by={} [{}]",
            event.ts,
            serde_json::to_value(event.event_type)
                .ok()
                .and_then(|value| value.as_str().map(|s| s.to_string()))
                .unwrap_or_default(),
            event.actor,
            event_id
        );
    }
    if data.truncated {
        println!("(showing {}, use --limit to see more)", data.count);
    }
}

pub fn print_label_list(labels: &[LabelCount]) {
    if labels.is_empty() {
        println!("no labels");
        return;
    }
    for entry in labels {
        println!("{} ({})", entry.label, entry.count);
    }
}

pub fn print_task_note(task_id: &str, note: &TaskNote) {
    println!("{} note added", task_id);
    println!("{} by={} [{}]", note.ts, note.actor, note.event_id);
    println!("{}", note.text);
}

pub fn print_task_notes(task_id: &str, notes: &[TaskNote]) {
    if notes.is_empty() {
        println!("{}: no notes", task_id);
        return;
    }
    println!("{} notes={}", task_id, notes.len());
    for note in notes {
        println!("{} by={} [{}]", note.ts, note.actor, note.event_id);
        println!("{}", note.text);
    }
}

pub fn print_orphans_result(result: &OrphansResult) {
    if result.total == 0 {
        println!("clean -- no orphaned deps or links");
        return;
    }
    if !result.orphaned_deps.is_empty() {
        println!("orphaned_deps={}", result.orphaned_deps.len());
        for dep in &result.orphaned_deps {
            println!(
                "  {} -> {} ({})",
                dep.child,
                dep.blocker,
                dep_type_to_string(dep.dep_type)
            );
        }
    }
    if !result.orphaned_links.is_empty() {
        println!("orphaned_links={}", result.orphaned_links.len());
        for link in &result.orphaned_links {
            println!("  {} -[{}]-> {}", link.src, link.rel_type, link.dst);
        }
    }
    println!("total={}", result.total);
}
