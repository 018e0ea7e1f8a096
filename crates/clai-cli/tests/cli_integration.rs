use assert_cmd::Command;
use predicates::prelude::*;

fn clai() -> Command {
    Command::cargo_bin("clai").unwrap()
}

#[test]
fn help_lists_subcommands() {
    clai()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("suggest"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn version_prints() {
    clai()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("clai"));
}

#[test]
fn status_without_daemon_fails_with_hint() {
    let temp = tempfile::tempdir().unwrap();
    clai()
        .arg("status")
        .env("CLAI_HOME", temp.path())
        .env("CLAI_CACHE", temp.path().join("cache"))
        .env_remove("CLAI_SOCKET")
        .assert()
        .failure()
        .stderr(predicate::str::contains("clai serve"));
}

#[test]
fn suggest_respects_clai_off() {
    let temp = tempfile::tempdir().unwrap();
    // CLAI_OFF short-circuits before any socket access, so this succeeds
    // even with no daemon running.
    clai()
        .arg("suggest")
        .arg("git")
        .env("CLAI_HOME", temp.path())
        .env("CLAI_OFF", "1")
        .assert()
        .success();
}

#[test]
fn query_rejects_conflicting_filters() {
    clai()
        .arg("query")
        .arg("--successes")
        .arg("--failures")
        .assert()
        .failure();
}
