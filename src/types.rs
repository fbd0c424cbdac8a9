use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Task,
    Feature,
    Epic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Blocked,
    Closed,
    Canceled,
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningState {
    NeedsPlanning,
    Planned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Blocks,
    StartsAfter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepDirection {
    Up,
    Down,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    RelatesTo,
    RepliesTo,
    Duplicates,
    Supersedes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNote {
    pub event_id: String,
    pub ts: String,
    pub actor: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub notes: Vec<TaskNote>,
    pub status: TaskStatus,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovered_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_attached_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_attached_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_state: Option<PlanningState>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub blocker: String,
    pub dep_type: DependencyType,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencyEdgeWire {
    Legacy(String),
    Typed {
        blocker: String,
        #[serde(default)]
        dep_type: Option<DependencyType>,
    },
}

impl<'de> Deserialize<'de> for DependencyEdge {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = DependencyEdgeWire::deserialize(deserializer)?;
        Ok(match wire {
            DependencyEdgeWire::Legacy(blocker) => DependencyEdge {
                blocker,
                dep_type: DependencyType::Blocks,
            },
            DependencyEdgeWire::Typed { blocker, dep_type } => DependencyEdge {
                blocker,
                dep_type: dep_type.unwrap_or(DependencyType::Blocks),
            },
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRef {
    pub id: String,
    pub dep_type: DependencyType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTreeNode {
    pub task: Task,
    pub blockers: Vec<String>,
    pub dependents: Vec<String>,
    pub blocker_edges: Vec<DependencyRef>,
    pub dependent_edges: Vec<DependencyRef>,
    pub children: Vec<TaskTreeNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[serde(rename = "task.created")]
    TaskCreated,
    #[serde(rename = "task.updated")]
    TaskUpdated,
    #[serde(rename = "task.status_set")]
    TaskStatusSet,
    #[serde(rename = "task.claimed")]
    TaskClaimed,
    #[serde(rename = "task.noted")]
    TaskNoted,
    #[serde(rename = "task.spec_attached")]
    TaskSpecAttached,
    #[serde(rename = "task.superseded")]
    TaskSuperseded,
    #[serde(rename = "dep.added")]
    DepAdded,
    #[serde(rename = "dep.removed")]
    DepRemoved,
    #[serde(rename = "link.added")]
    LinkAdded,
    #[serde(rename = "link.removed")]
    LinkRemoved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Canonical field name. Readers also accept the legacy `event_id` name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub ts: String,
    pub actor: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub task_id: String,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct State {
    pub tasks: HashMap<String, Task>,
    pub deps: HashMap<String, Vec<DependencyEdge>>,
    pub links: HashMap<String, HashMap<RelationType, HashSet<String>>>,
    pub child_counters: HashMap<String, u64>,
    pub created_order: Vec<String>,
    pub applied_events: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: String,
    pub event_count: usize,
    pub state: State,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub schema_version: u32,
    pub snapshot_every: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeOk<T> {
    pub schema_version: u32,
    pub command: String,
    pub ok: bool,
    pub data: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeErr {
    pub schema_version: u32,
    pub command: String,
    pub ok: bool,
    pub error: EnvelopeError,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Ok(EnvelopeOk<T>),
    Err(EnvelopeErr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairDep {
    pub child: String,
    pub blocker: String,
    pub dep_type: DependencyType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairLink {
    pub src: String,
    pub dst: String,
    pub rel_type: RelationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairPlan {
    pub orphaned_deps: Vec<RepairDep>,
    pub orphaned_links: Vec<RepairLink>,
    pub stale_temp_files: Vec<String>,
    pub lock_present: bool,
    pub excess_snapshots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairResult {
    pub plan: RepairPlan,
    pub applied: bool,
    pub events_appended: usize,
    pub files_removed: usize,
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub repo_root: String,
    pub actor: String,
}
