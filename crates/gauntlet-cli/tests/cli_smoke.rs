use assert_cmd::Command;
use predicates::prelude::*;

fn suite_yaml() -> &'static str {
    r#"
version: 1
suite: smoke
tasks:
  - id: capital
    type: chat_quality
    prompt: "What is the capital of France?"
    expected:
      type: must_contain
      must_contain: ["Paris"]
"#
}

#[test]
fn validate_accepts_a_well_formed_suite() {
    let dir = tempfile::tempdir().unwrap();
    let suite = dir.path().join("suite.yaml");
    std::fs::write(&suite, suite_yaml()).unwrap();

    Command::cargo_bin("gauntlet")
        .unwrap()
        .args(["validate", "--suite-file"])
        .arg(&suite)
        .assert()
        .success()
        .stderr(predicate::str::contains("OK"));
}

#[test]
fn validate_rejects_an_empty_suite() {
    let dir = tempfile::tempdir().unwrap();
    let suite = dir.path().join("suite.yaml");
    std::fs::write(&suite, "version: 1\nsuite: empty\ntasks: []\n").unwrap();

    Command::cargo_bin("gauntlet")
        .unwrap()
        .args(["validate", "--suite-file"])
        .arg(&suite)
        .assert()
        .code(2);
}

#[test]
fn validate_rejects_a_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let suite = dir.path().join("suite.yaml");
    std::fs::write(&suite, suite_yaml()).unwrap();
    let config = dir.path().join("gauntlet.yaml");
    std::fs::write(&config, "max_concurrent_runs: 0\n").unwrap();

    Command::cargo_bin("gauntlet")
        .unwrap()
        .args(["validate", "--suite-file"])
        .arg(&suite)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2);
}

#[test]
fn leaderboard_on_a_fresh_database_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("gauntlet.db");

    Command::cargo_bin("gauntlet")
        .unwrap()
        .args(["leaderboard", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("no competitors yet"));
}

#[test]
fn status_of_an_unknown_run_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("gauntlet.db");

    Command::cargo_bin("gauntlet")
        .unwrap()
        .args(["status", "42", "--db"])
        .arg(&db)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}
