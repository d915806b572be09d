//! Views computed from a live store follow its clock and its mutations.

use chrono::{Duration as Days, TimeZone, Utc};
use lanes_core::clock::ManualClock;
use lanes_core::gateway::InMemoryGateway;
use lanes_core::model::{Issue, Priority, Severity, Status};
use lanes_core::store::{IssueStore, StoreConfig};
use lanes_triage::view::{FilterCriteria, SortKey, StoreView};

fn issue(id: &str, status: Status, priority: Priority, severity: u8) -> Issue {
    Issue {
        id: id.into(),
        title: format!("Issue {id}"),
        status,
        priority,
        severity: Severity::new(severity).unwrap(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        assignee: String::new(),
        tags: vec![],
    }
}

#[test]
fn board_reflects_optimistic_moves_and_undo() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    let gateway = InMemoryGateway::new(vec![
        issue("A", Status::Backlog, Priority::High, 4),
        issue("B", Status::Backlog, Priority::Low, 9),
        issue("C", Status::InProgress, Priority::Medium, 2),
    ]);
    let mut store = IssueStore::new(StoreConfig::default(), gateway, clock);
    store.fetch_all();

    let all = FilterCriteria::default();
    let before = store.board(&all, SortKey::PriorityScore);
    assert_eq!(before.column(Status::Backlog).unwrap().issues.len(), 2);

    assert!(store.request_status_change("A", Status::InProgress, true).is_applied());
    let moved = store.board(&all, SortKey::PriorityScore);
    let in_progress: Vec<_> = moved
        .column(Status::InProgress)
        .unwrap()
        .issues
        .iter()
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(in_progress, vec!["A", "C"]);

    store.undo_last_action();
    assert_eq!(store.board(&all, SortKey::PriorityScore), before);
}

#[test]
fn view_uses_store_clock_for_scores() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    let mut older = issue("OLD", Status::Backlog, Priority::Medium, 5);
    older.created_at -= Days::days(30);
    let gateway = InMemoryGateway::new(vec![older, issue("NEW", Status::Backlog, Priority::Medium, 5)]);
    let mut store = IssueStore::new(StoreConfig::default(), gateway, clock);
    store.fetch_all();

    let ids: Vec<_> = store
        .view(&FilterCriteria::default(), SortKey::PriorityScore)
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec!["NEW", "OLD"]);
}
