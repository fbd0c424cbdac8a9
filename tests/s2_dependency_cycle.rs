mod common;

use common::{create_task, init_repo, make_repo, read_event_lines, run_json};

#[test]
fn reverse_blocks_edge_is_rejected_as_a_cycle() {
    let repo = make_repo();
    init_repo(repo.path());

    let a = create_task(repo.path(), "A");
    let b = create_task(repo.path(), "B");

    let add = run_json(repo.path(), ["dep", "add", &a, &b]);
    assert_eq!(add.cli.code, 0, "stderr:\n{}", add.cli.stderr);

    let reverse = run_json(repo.path(), ["dep", "add", &b, &a]);
    assert_eq!(reverse.cli.code, 1);
    common::assert_error_code(&reverse, "DEPENDENCY_CYCLE");

    let lines = read_event_lines(repo.path());
    assert_eq!(
        lines.len(),
        3,
        "two creates plus the one accepted dep.added, the rejected attempt must not append"
    );
}
