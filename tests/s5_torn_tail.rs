mod common;

use common::{create_task, events_file, init_repo, make_repo};
use std::fs::OpenOptions;
use std::io::Write;
use tasque::app::state::load_projected_state;

#[test]
fn malformed_trailing_line_is_dropped_with_a_warning() {
    let repo = make_repo();
    init_repo(repo.path());
    let a = create_task(repo.path(), "A");
    let b = create_task(repo.path(), "B");

    let mut file = OpenOptions::new()
        .append(true)
        .open(events_file(repo.path()))
        .unwrap();
    write!(file, "{{\"id\":\"tornevent\",\"task_id\":\"{}", a).unwrap();
    drop(file);

    let loaded = load_projected_state(repo.path()).expect("tail-tolerant load must not fail");
    assert!(loaded.state.tasks.contains_key(&a));
    assert!(loaded.state.tasks.contains_key(&b));
    assert_eq!(loaded.state.tasks.len(), 2);
    assert!(
        loaded.warning.is_some(),
        "a torn trailing line must surface a non-empty warning"
    );
}

#[test]
fn malformed_middle_line_fails_with_events_corrupt() {
    let repo = make_repo();
    init_repo(repo.path());
    let a = create_task(repo.path(), "A");
    let _b = create_task(repo.path(), "B");

    let path = events_file(repo.path());
    let original = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = original.lines().collect();
    lines.insert(1, "not even close to json {{{");
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    let error = load_projected_state(repo.path()).expect_err("a corrupt middle line must fail");
    assert_eq!(error.code, "EVENTS_CORRUPT");
    assert!(a.starts_with("tsq-"));
}
