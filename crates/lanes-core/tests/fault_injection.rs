//! Fault-injection tests: the store against an unreliable remote.
//!
//! Every remote failure must be recovered locally. A failed fetch keeps the
//! previous collection, a failed edit leaves its record untouched, and
//! neither ever leaves the store loading.

use chrono::{TimeZone, Utc};
use lanes_core::clock::ManualClock;
use lanes_core::gateway::{FaultConfig, InMemoryGateway, IssueGateway};
use lanes_core::model::{Issue, IssueUpdate, Priority, Severity, Status};
use lanes_core::notify::Level;
use lanes_core::store::{EditOutcome, IssueStore, StoreConfig};
use lanes_core::sync::PollInterval;
use std::time::Duration;

const SEED: u64 = 0x5EED_F00D;

fn issue(n: usize) -> Issue {
    Issue {
        id: format!("LANE-{n}"),
        title: format!("Fixture issue {n}"),
        status: Status::Backlog,
        priority: Priority::Low,
        severity: Severity::new(3).expect("valid severity"),
        created_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        assignee: String::new(),
        tags: vec![],
    }
}

fn flaky_store(faults: FaultConfig) -> (IssueStore<InMemoryGateway, ManualClock>, ManualClock) {
    let clock = ManualClock::at_millis(1_700_000_000_000);
    let gateway = InMemoryGateway::with_faults((0..10).map(issue).collect(), faults, SEED);
    (
        IssueStore::new(StoreConfig::default(), gateway, clock.clone()),
        clock,
    )
}

#[test]
fn flaky_updates_fail_roughly_one_in_ten_and_never_corrupt_records() {
    let (mut store, _clock) = flaky_store(FaultConfig::flaky_updates());
    store.fetch_all();
    assert_eq!(store.len(), 10);

    let mut failures = 0;
    for round in 0..200 {
        let id = format!("LANE-{}", round % 10);
        let before = store.issue(&id).cloned().expect("issue exists");
        let update = IssueUpdate {
            title: Some(format!("Renamed in round {round}")),
            ..IssueUpdate::default()
        };
        match store.request_edit(&id, &update, true) {
            EditOutcome::Updated(issue) => {
                assert_eq!(issue.title, format!("Renamed in round {round}"));
                assert_eq!(store.issue(&id), Some(&issue));
                assert!(store.last_error().is_none());
            }
            EditOutcome::Failed(_) => {
                failures += 1;
                assert_eq!(store.issue(&id), Some(&before));
                assert!(store.last_error().is_some());
            }
            EditOutcome::Ignored(reason) => panic!("unexpected ignore: {reason:?}"),
        }
        assert!(!store.is_loading());
    }
    assert!((5..=40).contains(&failures), "failures = {failures}");

    let levels: Vec<Level> = store
        .take_notifications()
        .into_iter()
        .map(|note| note.level)
        .collect();
    assert_eq!(levels.iter().filter(|l| **l == Level::Error).count(), failures);
    assert_eq!(levels.len(), 200);
}

#[test]
fn same_seed_fails_the_same_calls() {
    let run = || {
        let (mut store, _clock) = flaky_store(FaultConfig::flaky_updates());
        store.fetch_all();
        (0..50)
            .map(|round| {
                let update = IssueUpdate {
                    assignee: Some(format!("user{round}")),
                    ..IssueUpdate::default()
                };
                matches!(
                    store.request_edit("LANE-1", &update, true),
                    EditOutcome::Failed(_)
                )
            })
            .collect::<Vec<bool>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn polling_rides_out_fetch_outages() {
    let faults = FaultConfig {
        fetch_failure_percent: 100,
        update_failure_percent: 0,
    };
    let (mut store, clock) = flaky_store(FaultConfig::default());
    store.fetch_all();
    assert!(
        store
            .request_status_change("LANE-0", Status::InProgress, true)
            .is_applied()
    );

    // swap in a remote that is down
    let mut down = InMemoryGateway::with_faults((0..10).map(issue).collect(), faults, SEED);
    std::mem::swap(store.gateway_mut(), &mut down);

    store.set_polling_interval(PollInterval::FiveSeconds);
    store.set_polling_enabled(true);
    for _ in 0..3 {
        clock.advance(Duration::from_secs(5));
        store.run_due_timers();
        assert!(store.last_error().is_some());
        assert!(!store.is_loading());
        // the optimistic move survives failed refreshes
        assert_eq!(
            store.issue("LANE-0").map(|issue| issue.status),
            Some(Status::InProgress)
        );
    }
    assert_eq!(store.gateway().fetch_calls(), 3);

    // remote recovers
    std::mem::swap(store.gateway_mut(), &mut down);
    clock.advance(Duration::from_secs(5));
    store.run_due_timers();
    assert!(store.last_error().is_none());
    assert_eq!(
        store.issue("LANE-0").map(|issue| issue.status),
        Some(Status::Backlog)
    );
    assert!(store.sync_metadata().last_synced_at.is_some());
}

#[test]
fn scripted_update_failure_then_retry_succeeds() {
    let (mut store, _clock) = flaky_store(FaultConfig::default());
    store.fetch_all();
    store.gateway_mut().fail_next_updates(1);

    let update = IssueUpdate {
        priority: Some(Priority::High),
        ..IssueUpdate::default()
    };
    assert!(matches!(
        store.request_edit("LANE-4", &update, true),
        EditOutcome::Failed(_)
    ));
    assert_eq!(store.issue("LANE-4").map(|i| i.priority), Some(Priority::Low));

    assert!(matches!(
        store.request_edit("LANE-4", &update, true),
        EditOutcome::Updated(_)
    ));
    assert_eq!(store.issue("LANE-4").map(|i| i.priority), Some(Priority::High));
    assert_eq!(store.gateway().update_calls().len(), 2);
}

#[test]
fn issue_deleted_remotely_is_not_found_on_edit() {
    let (mut store, _clock) = flaky_store(FaultConfig::default());
    store.fetch_all();
    store.gateway_mut().remove("LANE-2");

    let update = IssueUpdate {
        title: Some("gone".into()),
        ..IssueUpdate::default()
    };
    let EditOutcome::Failed(err) = store.request_edit("LANE-2", &update, true) else {
        panic!("edit of a remotely deleted issue should fail");
    };
    assert_eq!(err.code().code(), "E2001");
    // the local copy stays until the next fetch
    assert!(store.issue("LANE-2").is_some());
    store.fetch_all();
    assert!(store.issue("LANE-2").is_none());
    assert!(store.gateway_mut().fetch_all().is_ok());
}
