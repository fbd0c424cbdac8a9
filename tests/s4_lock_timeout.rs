mod common;

use common::{init_repo, make_repo, read_event_lines, run_cli_with_env};
use std::thread;
use std::time::Duration;

#[test]
fn concurrent_writer_times_out_while_another_process_holds_the_lock() {
    let repo = make_repo();
    init_repo(repo.path());
    let repo_root = repo.path().to_path_buf();

    let holder = thread::spawn(move || {
        tasque::store::lock::with_write_lock(&repo_root, || {
            thread::sleep(Duration::from_millis(1500));
            Ok(())
        })
        .expect("lock holder thread failed to acquire the write lock");
    });

    thread::sleep(Duration::from_millis(150));

    let result = run_cli_with_env(
        repo.path(),
        ["create", "Blocked by contention", "--json"],
        &[("TSQ_LOCK_TIMEOUT_MS", "500")],
    );
    assert_eq!(result.code, 3, "stdout:\n{}\nstderr:\n{}", result.stdout, result.stderr);
    let envelope: serde_json::Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(
        envelope
            .get("error")
            .and_then(|error| error.get("code"))
            .and_then(serde_json::Value::as_str),
        Some("LOCK_TIMEOUT")
    );

    holder.join().expect("lock holder thread panicked");

    let lines = read_event_lines(repo.path());
    assert!(lines.is_empty(), "the timed-out writer must not append an event");
}
