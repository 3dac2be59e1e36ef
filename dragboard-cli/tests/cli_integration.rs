use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BOARD: &str = r#"[
  {"id": "todo", "name": "To Do", "tasks": [
    {"id": "a", "columnId": "todo", "name": "A"},
    {"id": "b", "columnId": "todo", "name": "B"},
    {"id": "c", "columnId": "todo", "name": "C"}
  ]},
  {"id": "done", "name": "Done", "tasks": null}
]"#;

fn fixture(temp: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = temp.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

fn dragboard() -> Command {
    let mut cmd = Command::cargo_bin("dragboard").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn ids(container: &Value) -> Vec<&str> {
    container["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect()
}

#[test]
fn test_help_lists_commands() {
    dragboard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("replay"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_replay_drop_on_empty_container() {
    let temp = TempDir::new().unwrap();
    let board = fixture(&temp, "board.json", BOARD);
    let script = fixture(&temp, "script.yaml", "- start: b\n- hover: done\n- drop: done\n");

    let output = dragboard()
        .args(["replay"])
        .arg(&board)
        .arg(&script)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ids(&report["board"][0]), vec!["a", "c"]);
    assert_eq!(ids(&report["board"][1]), vec!["b"]);
    assert_eq!(report["board"][1]["items"][0]["containerId"], "done");
    assert_eq!(
        report["instructions"],
        serde_json::json!([{"id": "b", "columnId": "done", "position": 0}])
    );
    assert_eq!(report["events"][0]["outcome"], "confirmed");
}

#[test]
fn test_replay_cancel_issues_nothing() {
    let temp = TempDir::new().unwrap();
    let board = fixture(&temp, "board.json", BOARD);
    let script = fixture(&temp, "script.yaml", "- start: a\n- hover: done\n- cancel\n");

    let output = dragboard()
        .args(["--format", "json", "replay"])
        .arg(&board)
        .arg(&script)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ids(&report["board"][0]), vec!["a", "b", "c"]);
    assert_eq!(report["instructions"], serde_json::json!([]));
    assert_eq!(report["events"], serde_json::json!([]));
}

#[test]
fn test_replay_yaml_output() {
    let temp = TempDir::new().unwrap();
    let board = fixture(&temp, "board.json", BOARD);
    let script = fixture(&temp, "script.json", r#"[{"start": "a"}, {"drop": "c"}]"#);

    dragboard()
        .args(["--format", "yaml", "replay"])
        .arg(&board)
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("instructions:"))
        .stdout(predicate::str::contains("columnId: todo"))
        .stdout(predicate::str::contains("position: 2"));
}

#[test]
fn test_replay_rollback_from_config_file() {
    let temp = TempDir::new().unwrap();
    let board = fixture(&temp, "board.json", BOARD);
    let script = fixture(&temp, "script.yaml", "- fail_next: 1\n- start: b\n- drop: done\n");
    let config = fixture(&temp, "dragboard.toml", "[sync]\nfailure_policy = \"rollback\"\n");

    let output = dragboard()
        .arg("--config")
        .arg(&config)
        .arg("replay")
        .arg(&board)
        .arg(&script)
        .env_remove("DRAGBOARD_SYNC__FAILURE_POLICY")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ids(&report["board"][0]), vec!["a", "b", "c"]);
    assert_eq!(report["events"][0]["outcome"], "rolled_back");
}

#[test]
fn test_replay_policy_from_environment() {
    let temp = TempDir::new().unwrap();
    let board = fixture(&temp, "board.json", BOARD);
    let script = fixture(&temp, "script.yaml", "- fail_next: 1\n- start: b\n- drop: done\n");

    let output = dragboard()
        .arg("replay")
        .arg(&board)
        .arg(&script)
        .env("DRAGBOARD_SYNC__FAILURE_POLICY", "rollback")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["events"][0]["outcome"], "rolled_back");
}

#[test]
fn test_replay_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    let board = fixture(&temp, "board.json", BOARD);
    let script = fixture(&temp, "script.yaml", "[]");
    let config = fixture(&temp, "dragboard.yaml", "sync:\n  max_attempts: 0\n");

    dragboard()
        .arg("--config")
        .arg(&config)
        .arg("replay")
        .arg(&board)
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_attempts"));
}

#[test]
fn test_check_valid_board() {
    let temp = TempDir::new().unwrap();
    let board = fixture(&temp, "board.json", BOARD);

    let output = dragboard().arg("check").arg(&board).output().unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report, serde_json::json!({"valid": true, "containers": 2, "items": 3, "repaired": 0}));
}

#[test]
fn test_check_flags_wrong_container_id() {
    let temp = TempDir::new().unwrap();
    let board = fixture(
        &temp,
        "board.json",
        r#"[{"id": "todo", "name": "To Do", "tasks": [{"id": "a", "columnId": "done", "name": "A"}]},
            {"id": "done", "name": "Done", "tasks": []}]"#,
    );

    let output = dragboard().arg("check").arg(&board).output().unwrap();
    assert!(!output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], false);
    assert_eq!(report["repaired"], 1);
}

#[test]
fn test_check_duplicate_ids_fails() {
    let temp = TempDir::new().unwrap();
    let board = fixture(
        &temp,
        "board.json",
        r#"[{"id": "todo", "name": "To Do", "items": []}, {"id": "todo", "name": "Again", "items": []}]"#,
    );

    dragboard()
        .arg("check")
        .arg(&board)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate"));
}

#[test]
fn test_missing_board_file_fails() {
    dragboard()
        .args(["check", "/nonexistent/board.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read board file"));
}
