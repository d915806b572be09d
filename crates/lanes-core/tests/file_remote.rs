//! Store and recently-accessed list backed by files on disk.

use chrono::{TimeZone, Utc};
use lanes_core::clock::{Clock, ManualClock};
use lanes_core::gateway::JsonFileGateway;
use lanes_core::lock::{WriteLock, lock_path_for};
use lanes_core::model::{Issue, IssueUpdate, Priority, Severity, Status};
use lanes_core::recent::{FileKvStore, KvStore, RecentlyAccessed, STORAGE_KEY};
use lanes_core::store::{EditOutcome, IssueStore, StoreConfig};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn issue(id: &str, status: Status) -> Issue {
    Issue {
        id: id.into(),
        title: format!("Issue {id}"),
        status,
        priority: Priority::Medium,
        severity: Severity::new(6).expect("valid severity"),
        created_at: Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
        assignee: String::new(),
        tags: vec!["core".into()],
    }
}

fn write_issues(path: &Path, issues: &[Issue]) {
    std::fs::write(path, serde_json::to_string_pretty(issues).expect("serialize"))
        .expect("write issues file");
}

fn read_issues(path: &Path) -> Vec<Issue> {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("parse")
}

#[test]
fn edits_round_trip_through_the_issues_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.json");
    write_issues(
        &path,
        &[issue("A", Status::Backlog), issue("B", Status::Done)],
    );

    let clock = ManualClock::at_millis(0);
    let mut store = IssueStore::new(StoreConfig::default(), JsonFileGateway::new(&path), clock);
    store.fetch_all();
    assert_eq!(store.len(), 2);

    let update = IssueUpdate {
        status: Some(Status::InProgress),
        assignee: Some("kim".into()),
        ..IssueUpdate::default()
    };
    let EditOutcome::Updated(updated) = store.request_edit("B", &update, true) else {
        panic!("edit should succeed");
    };
    assert_eq!(updated.status, Status::InProgress);

    let on_disk = read_issues(&path);
    assert_eq!(on_disk[1], updated);
    assert_eq!(on_disk[0], issue("A", Status::Backlog));
}

#[test]
fn another_writer_is_seen_on_next_fetch() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.json");
    write_issues(&path, &[issue("A", Status::Backlog)]);

    let mut store = IssueStore::new(
        StoreConfig::default(),
        JsonFileGateway::new(&path),
        ManualClock::at_millis(0),
    );
    store.fetch_all();
    write_issues(
        &path,
        &[issue("A", Status::InProgress), issue("C", Status::Backlog)],
    );
    store.fetch_all();
    assert_eq!(store.len(), 2);
    assert_eq!(store.issue("A").map(|i| i.status), Some(Status::InProgress));
}

#[test]
fn held_write_lock_turns_into_a_recoverable_failure() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("issues.json");
    write_issues(&path, &[issue("A", Status::Backlog)]);

    let mut store = IssueStore::new(
        StoreConfig::default(),
        JsonFileGateway::new(&path),
        ManualClock::at_millis(0),
    );
    store.fetch_all();

    let _held = WriteLock::acquire(&lock_path_for(&path), Duration::from_millis(100))
        .expect("lock is free");
    let update = IssueUpdate {
        title: Some("blocked".into()),
        ..IssueUpdate::default()
    };
    assert!(matches!(
        store.request_edit("A", &update, true),
        EditOutcome::Failed(_)
    ));
    assert_eq!(store.issue("A").map(|i| i.title.as_str()), Some("Issue A"));
    assert!(store.last_error().is_some());
}

#[test]
fn recent_list_survives_a_restart() {
    let dir = TempDir::new().expect("temp dir");
    let state = dir.path().join("nested/state.json");
    let clock = ManualClock::at_millis(1_000);

    {
        let mut recent = RecentlyAccessed::new(FileKvStore::new(&state), clock.clone(), 5);
        recent.load();
        for n in 0..7 {
            clock.advance(Duration::from_millis(10));
            recent.record(&format!("LANE-{n}"), &format!("Issue {n}"));
        }
        recent.record("LANE-3", "Issue 3 renamed");
    }

    let mut reopened = RecentlyAccessed::new(FileKvStore::new(&state), clock.clone(), 5);
    reopened.load();
    let ids: Vec<&str> = reopened.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["LANE-3", "LANE-6", "LANE-5", "LANE-4", "LANE-2"]);
    assert_eq!(reopened.entries()[0].title, "Issue 3 renamed");
    assert_eq!(reopened.entries()[0].accessed_at, clock.now_millis());

    reopened.clear();
    assert_eq!(FileKvStore::new(&state).get(STORAGE_KEY).expect("readable"), None);
}
