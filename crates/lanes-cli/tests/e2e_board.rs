//! E2E tests for the read side of the board: list, board, show, recent.
//!
//! Each test runs the `lanes` binary as a subprocess in an isolated temp
//! directory with its own issues file, config dir and state file.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the lanes binary, rooted in `dir`.
fn lanes_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lanes"));
    cmd.current_dir(dir);
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg/config"));
    cmd.env("XDG_DATA_HOME", dir.join(".xdg/data"));
    cmd.env_remove("FORMAT");
    // Suppress tracing output that goes to stderr
    cmd.env("LANES_LOG", "error");
    cmd.args(["--state", dir.join("state.json").to_str().expect("utf-8 path")]);
    cmd
}

fn fixture() -> Value {
    json!([
        {
            "id": "LANE-1",
            "title": "Login page times out",
            "status": "Backlog",
            "priority": "high",
            "severity": 8,
            "createdAt": "2024-05-01T08:00:00Z",
            "assignee": "",
            "tags": ["auth"]
        },
        {
            "id": "LANE-2",
            "title": "Dark mode toggle",
            "status": "In Progress",
            "priority": "low",
            "severity": 2,
            "createdAt": "2024-05-01T08:00:00Z",
            "assignee": "dana",
            "tags": ["ui"]
        },
        {
            "id": "LANE-3",
            "title": "Export to CSV",
            "status": "Done",
            "priority": "medium",
            "severity": 5,
            "createdAt": "2024-05-01T08:00:00Z",
            "assignee": "sam",
            "tags": []
        }
    ])
}

/// A project with the fixture issues file in place.
fn project() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    std::fs::create_dir_all(dir.path().join(".lanes")).expect("mkdir .lanes");
    std::fs::write(
        dir.path().join(".lanes/issues.json"),
        serde_json::to_string_pretty(&fixture()).expect("serialize fixture"),
    )
    .expect("write issues");
    dir
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = lanes_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("lanes should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn ids(rows: &Value) -> Vec<&str> {
    rows.as_array()
        .expect("array")
        .iter()
        .map(|row| row["id"].as_str().expect("id"))
        .collect()
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[test]
fn list_orders_by_priority_score_by_default() {
    let dir = project();
    let rows = run_json(dir.path(), &["list"]);
    // same age: 180 > 70 > 20 before the age penalty
    assert_eq!(ids(&rows), ["LANE-1", "LANE-3", "LANE-2"]);
    assert!(rows[0]["score"].as_i64().expect("score") > rows[1]["score"].as_i64().expect("score"));
}

#[test]
fn list_filters_combine() {
    let dir = project();
    assert_eq!(
        ids(&run_json(dir.path(), &["list", "--status", "in-progress"])),
        ["LANE-2"]
    );
    assert_eq!(ids(&run_json(dir.path(), &["list", "-q", "AUTH"])), ["LANE-1"]);
    assert_eq!(ids(&run_json(dir.path(), &["list", "--assignee", ""])), ["LANE-1"]);
    assert!(
        run_json(dir.path(), &["list", "--priority", "high", "--status", "done"])
            .as_array()
            .expect("array")
            .is_empty()
    );
}

#[test]
fn list_sort_and_limit() {
    let dir = project();
    assert_eq!(
        ids(&run_json(dir.path(), &["list", "--sort", "title"])),
        ["LANE-2", "LANE-3", "LANE-1"]
    );
    assert_eq!(ids(&run_json(dir.path(), &["list", "-n", "1"])), ["LANE-1"]);
}

#[test]
fn list_text_mode_has_header_row() {
    let dir = project();
    lanes_cmd(dir.path())
        .args(["list", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "ID\tSTATUS\tPRIORITY\tSEVERITY\tSCORE\tASSIGNEE\tTITLE\n",
        ))
        .stdout(predicate::str::contains("LANE-2\tIn Progress\tlow\t2\t"));
}

// ---------------------------------------------------------------------------
// board
// ---------------------------------------------------------------------------

#[test]
fn board_has_three_columns_in_workflow_order() {
    let dir = project();
    let board = run_json(dir.path(), &["board"]);
    assert_eq!(board["total"], 3);
    let statuses: Vec<&str> = board["columns"]
        .as_array()
        .expect("columns")
        .iter()
        .map(|column| column["status"].as_str().expect("status"))
        .collect();
    assert_eq!(statuses, ["Backlog", "In Progress", "Done"]);
    assert_eq!(board["columns"][1]["issues"][0]["id"], "LANE-2");
}

#[test]
fn board_filter_keeps_empty_columns() {
    let dir = project();
    let board = run_json(dir.path(), &["board", "--assignee", "sam"]);
    assert_eq!(board["total"], 1);
    assert_eq!(board["columns"][0]["count"], 0);
    assert_eq!(board["columns"][2]["count"], 1);
}

// ---------------------------------------------------------------------------
// show / recent
// ---------------------------------------------------------------------------

#[test]
fn show_reports_allowed_moves() {
    let dir = project();
    let issue = run_json(dir.path(), &["show", "LANE-1"]);
    assert_eq!(issue["title"], "Login page times out");
    assert_eq!(issue["can_move_to"], json!(["In Progress"]));

    let issue = run_json(dir.path(), &["show", "LANE-2"]);
    assert_eq!(issue["can_move_to"], json!(["Backlog", "Done"]));
}

#[test]
fn show_unknown_issue_fails_with_code() {
    let dir = project();
    lanes_cmd(dir.path())
        .args(["show", "LANE-404", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn recent_tracks_shown_issues_newest_first() {
    let dir = project();
    run_json(dir.path(), &["show", "LANE-1"]);
    run_json(dir.path(), &["show", "LANE-2"]);
    run_json(dir.path(), &["show", "LANE-1"]);

    let recent = run_json(dir.path(), &["recent"]);
    assert_eq!(ids(&recent), ["LANE-1", "LANE-2"]);
    assert_eq!(recent[0]["title"], "Login page times out");
    assert!(recent[0]["accessedAt"].as_i64().expect("accessedAt") > 0);

    let persisted: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("state.json")).expect("state file"),
    )
    .expect("state is JSON");
    assert!(persisted["recentlyAccessedIssues"].is_string());
}

#[test]
fn recent_clear_empties_the_list() {
    let dir = project();
    run_json(dir.path(), &["show", "LANE-3"]);
    let cleared = run_json(dir.path(), &["recent", "--clear"]);
    assert_eq!(cleared, json!([]));
    assert_eq!(run_json(dir.path(), &["recent"]), json!([]));
}

#[test]
fn recent_without_history_is_empty() {
    let dir = project();
    lanes_cmd(dir.path())
        .args(["recent", "--format", "text"])
        .assert()
        .success()
        .stdout("No recently accessed issues\n");
}

// ---------------------------------------------------------------------------
// remote failures
// ---------------------------------------------------------------------------

#[test]
fn missing_issues_file_is_a_fetch_failure() {
    let dir = TempDir::new().expect("temp dir");
    lanes_cmd(dir.path())
        .args(["list", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4001"));
}

#[test]
fn malformed_issues_file_is_reported() {
    let dir = project();
    std::fs::write(dir.path().join(".lanes/issues.json"), "{ not json").expect("write");
    lanes_cmd(dir.path())
        .args(["board", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4003"));
}

#[test]
fn issues_flag_overrides_project_file() {
    let dir = project();
    let elsewhere = dir.path().join("other.json");
    std::fs::write(
        &elsewhere,
        serde_json::to_string(&json!([fixture()[2].clone()])).expect("serialize"),
    )
    .expect("write");
    let rows = run_json(
        dir.path(),
        &["list", "--issues", elsewhere.to_str().expect("utf-8 path")],
    );
    assert_eq!(ids(&rows), ["LANE-3"]);
}

#[test]
fn completions_name_the_binary() {
    let dir = TempDir::new().expect("temp dir");
    lanes_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_lanes()"));
}
