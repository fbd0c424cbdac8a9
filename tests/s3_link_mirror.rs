mod common;

use common::{create_task, init_repo, make_repo, ok_data, run_json};
use serde_json::Value;

fn relates_to(envelope: &Value) -> Vec<String> {
    ok_data(envelope)
        .get("links")
        .and_then(|links| links.get("relates_to"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn relates_to_link_is_mirrored_on_both_sides_and_clears_on_removal() {
    let repo = make_repo();
    init_repo(repo.path());

    let a = create_task(repo.path(), "A");
    let b = create_task(repo.path(), "B");

    let add = run_json(repo.path(), ["link", "add", &a, &b, "--type", "relates_to"]);
    assert_eq!(add.cli.code, 0, "stderr:\n{}", add.cli.stderr);

    let show_a = run_json(repo.path(), ["show", &a]);
    assert!(relates_to(&show_a.envelope).contains(&b));
    let show_b = run_json(repo.path(), ["show", &b]);
    assert!(relates_to(&show_b.envelope).contains(&a));

    let remove = run_json(
        repo.path(),
        ["link", "remove", &a, &b, "--type", "relates_to"],
    );
    assert_eq!(remove.cli.code, 0, "stderr:\n{}", remove.cli.stderr);

    let show_a = run_json(repo.path(), ["show", &a]);
    assert!(!relates_to(&show_a.envelope).contains(&b));
    let show_b = run_json(repo.path(), ["show", &b]);
    assert!(!relates_to(&show_b.envelope).contains(&a));
}
