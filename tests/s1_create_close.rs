mod common;

use common::{create_task_with_args, init_repo, make_repo, ok_data, read_event_lines, run_json};
use serde_json::Value;

#[test]
fn create_then_close_produces_exactly_three_journal_lines() {
    let repo = make_repo();
    init_repo(repo.path());

    let task_id = create_task_with_args(repo.path(), "Fix login", &["-p", "1"]);

    let lines = read_event_lines(repo.path());
    assert_eq!(lines.len(), 1, "init must not append any event");
    let created: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(
        created.get("event_type").and_then(Value::as_str),
        Some("task.created")
    );
    assert_eq!(
        created.get("task_id").and_then(Value::as_str),
        Some(task_id.as_str())
    );

    let update = run_json(
        repo.path(),
        ["update", &task_id, "--status", "closed"],
    );
    let task = ok_data(&update.envelope).get("task").unwrap();
    assert_eq!(task.get("status").and_then(Value::as_str), Some("closed"));
    assert!(task.get("closed_at").and_then(Value::as_str).is_some());

    let lines = read_event_lines(repo.path());
    assert_eq!(lines.len(), 2);
    let status_set: Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(
        status_set.get("event_type").and_then(Value::as_str),
        Some("task.status_set")
    );
    assert_eq!(
        status_set
            .get("payload")
            .and_then(|payload| payload.get("status"))
            .and_then(Value::as_str),
        Some("closed")
    );
}
