mod common;

use common::{create_task, init_repo, make_repo};
use serde_json::Value;

fn snapshots_dir(repo: &std::path::Path) -> std::path::PathBuf {
    repo.join(".tasque").join("snapshots")
}

fn snapshot_files(repo: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(snapshots_dir(repo))
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
                .collect()
        })
        .unwrap_or_default()
}

fn write_snapshot_every_two(repo: &std::path::Path) {
    let config_path = repo.join(".tasque").join("config.json");
    std::fs::write(
        &config_path,
        serde_json::to_string_pretty(&serde_json::json!({
            "schema_version": 1,
            "snapshot_every": 2,
        }))
        .unwrap(),
    )
    .unwrap();
}

#[test]
fn snapshots_accumulate_every_two_events_and_are_pruned_to_five() {
    let repo = make_repo();
    init_repo(repo.path());
    write_snapshot_every_two(repo.path());

    create_task(repo.path(), "A");
    create_task(repo.path(), "B");
    let files = snapshot_files(repo.path());
    assert_eq!(files.len(), 1, "exactly one snapshot after two creates");
    let snapshot: Value = serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(snapshot.get("event_count").and_then(Value::as_u64), Some(2));

    create_task(repo.path(), "C");
    create_task(repo.path(), "D");
    assert_eq!(snapshot_files(repo.path()).len(), 2);

    for letter in ["E", "F", "G", "H", "I", "J"] {
        create_task(repo.path(), letter);
    }
    assert_eq!(
        snapshot_files(repo.path()).len(),
        5,
        "retention bounds the snapshot count at five after ten creates"
    );
}
